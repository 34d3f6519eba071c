//! Builds small TrueType fonts and WOFF2 files in memory.
//!
//! The glyph data is written in the same canonical form the WOFF2 decoder
//! produces, so decoding an encoded font yields the original bytes.

#![allow(dead_code)]

use fontembed::{sfnt, Tag};

pub const TRUETYPE: u32 = 0x00010000;
pub const OPENTYPE_CFF: u32 = 0x4F54544F;
pub const COLLECTION: u32 = 0x74746366;

const WOFF2_MAGIC: u32 = 0x774F4632;

// Composite flags.
const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
const ARGS_ARE_XY_VALUES: u16 = 0x0002;
const WE_HAVE_A_SCALE: u16 = 0x0008;
const MORE_COMPONENTS: u16 = 0x0020;
const WE_HAVE_INSTRUCTIONS: u16 = 0x0100;

#[derive(Debug, Clone)]
pub struct Component {
    pub glyph_id: u16,
    pub dx: i16,
    pub dy: i16,
    /// A uniform F2Dot14 scale.
    pub scale: Option<i16>,
}

#[derive(Debug, Clone)]
pub enum Glyph {
    Empty,
    Simple { contours: Vec<Vec<(i16, i16, bool)>>, instructions: Vec<u8> },
    Composite { components: Vec<Component>, instructions: Vec<u8> },
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct BBox {
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
}

impl BBox {
    fn union(self, other: BBox) -> BBox {
        BBox {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }

    fn translate(self, dx: i16, dy: i16) -> BBox {
        BBox {
            x_min: self.x_min + dx,
            y_min: self.y_min + dy,
            x_max: self.x_max + dx,
            y_max: self.y_max + dy,
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        for v in [self.x_min, self.y_min, self.x_max, self.y_max] {
            out.extend(v.to_be_bytes());
        }
    }
}

#[derive(Debug, Clone)]
pub struct FontBuilder {
    pub glyphs: Vec<Glyph>,
    pub advances: Vec<u16>,
    pub units_per_em: u16,
    /// Pairs of code point and glyph.
    pub cmap: Vec<(u32, u16)>,
    /// Whether to add a Unicode format 12 subtable next to the Windows BMP
    /// format 4 one.
    pub full_cmap: bool,
    pub postscript_name: Option<String>,
    pub short_loca: bool,
    /// Extra tables, copied as they are.
    pub extra_tables: Vec<(Tag, Vec<u8>)>,
    pub flavor: u32,
}

/// The font most tests work with.
///
/// | gid | glyph                                 | code point |
/// |-----|---------------------------------------|------------|
/// | 0   | .notdef, box with instructions        |            |
/// | 1   | A, with far away points               | U+0041     |
/// | 2   | space, empty                          | U+0020     |
/// | 3   | B, a long run of equal flags          | U+0042     |
/// | 4   | Ä, composite of 1 and 3               | U+00C4     |
/// | 5   | Å, composite of 4, scaled             | U+00C5     |
/// | 6   | grinning face                         | U+1F600    |
/// | 7   | unused                                |            |
pub fn test_font() -> FontBuilder {
    let notdef = Glyph::Simple {
        contours: vec![
            vec![(50, 0, true), (50, 700, true), (450, 700, true), (450, 0, true)],
            vec![(100, 50, true), (400, 50, true), (400, 650, true), (100, 650, true)],
        ],
        instructions: vec![0xB0, 0x01],
    };

    let a = Glyph::Simple {
        contours: vec![vec![
            (-30, 0, true),
            (280, 700, false),
            (600, 0, true),
            (5000, -4500, true),
            (1200, 900, false),
            (1200, 2500, true),
        ]],
        instructions: vec![],
    };

    // Many points with the same flags exceed the 255 repeat limit.
    let b = Glyph::Simple {
        contours: vec![
            (0..300).map(|i| (10 + i as i16, 0, true)).collect(),
            vec![(0, 10, false), (0, 20, false)],
        ],
        instructions: vec![0x40, 0x01, 0x05],
    };

    let a_dieresis = Glyph::Composite {
        components: vec![
            Component { glyph_id: 1, dx: 0, dy: 0, scale: None },
            Component { glyph_id: 3, dx: 120, dy: 800, scale: None },
        ],
        instructions: vec![0xB0, 0x00],
    };

    let a_ring = Glyph::Composite {
        components: vec![Component { glyph_id: 4, dx: -300, dy: 10, scale: Some(0x4000) }],
        instructions: vec![],
    };

    let smiley = Glyph::Simple {
        contours: vec![vec![(100, 100, true), (900, 100, true), (500, 900, false)]],
        instructions: vec![],
    };

    let unused = Glyph::Simple {
        contours: vec![vec![(0, 0, true), (10, 10, true), (20, 0, true)]],
        instructions: vec![],
    };

    FontBuilder {
        glyphs: vec![notdef, a, Glyph::Empty, b, a_dieresis, a_ring, smiley, unused],
        advances: vec![500, 600, 250, 620, 600, 600, 1000, 1000],
        units_per_em: 2048,
        cmap: vec![
            (0x20, 2),
            (0x41, 1),
            (0x42, 3),
            (0xC4, 4),
            (0xC5, 5),
            (0x1F600, 6),
        ],
        full_cmap: true,
        postscript_name: Some("TestSans-Regular".into()),
        short_loca: true,
        extra_tables: vec![
            (Tag::new(b"cvt "), vec![0, 10, 0, 20]),
            (Tag::new(b"fpgm"), vec![0xB0, 0x00, 0x2C]),
            (Tag::new(b"prep"), vec![0xB8, 0x01, 0xFF]),
            (Tag::new(b"gasp"), vec![0, 0, 0, 1, 0xFF, 0xFF, 0, 0x0F]),
            (Tag::new(b"OS/2"), vec![0; 78]),
        ],
        flavor: TRUETYPE,
    }
}

pub fn simple(points: &[(i16, i16, bool)]) -> Glyph {
    Glyph::Simple { contours: vec![points.to_vec()], instructions: vec![] }
}

pub fn composite(components: &[u16]) -> Glyph {
    Glyph::Composite {
        components: components
            .iter()
            .map(|&glyph_id| Component { glyph_id, dx: 0, dy: 0, scale: None })
            .collect(),
        instructions: vec![],
    }
}

/// The tables of a built font, ready for assembling or encoding.
#[derive(Debug, Clone)]
pub struct Tables {
    pub tables: Vec<(Tag, Vec<u8>)>,
    pub flavor: u32,
    pub num_h_metrics: u16,
    pub index_format: u16,
}

impl Tables {
    pub fn get(&self, tag: &[u8; 4]) -> &[u8] {
        &self.tables.iter().find(|(t, _)| *t == Tag::new(tag)).unwrap().1
    }

    pub fn assemble(&self) -> Vec<u8> {
        sfnt::assemble(self.flavor, self.tables.clone()).unwrap()
    }
}

impl FontBuilder {
    pub fn num_h_metrics(&self) -> u16 {
        let mut n = self.advances.len();
        while n > 1 && self.advances[n - 1] == self.advances[n - 2] {
            n -= 1;
        }
        n as u16
    }

    /// The bounding box of each glyph, `None` for empty ones.
    pub fn bboxes(&self) -> Vec<Option<BBox>> {
        (0..self.glyphs.len()).map(|i| self.bbox(i as u16, 0)).collect()
    }

    fn bbox(&self, glyph_id: u16, depth: usize) -> Option<BBox> {
        // Broken composites in error tests have no meaningful box.
        if depth > 8 {
            return None;
        }

        match self.glyphs.get(usize::from(glyph_id))? {
            Glyph::Empty => None,
            Glyph::Simple { contours, .. } => {
                let mut points = contours.iter().flatten();
                let &(x, y, _) = points.next()?;
                let start = BBox { x_min: x, y_min: y, x_max: x, y_max: y };
                Some(points.fold(start, |b, &(x, y, _)| {
                    b.union(BBox { x_min: x, y_min: y, x_max: x, y_max: y })
                }))
            }
            Glyph::Composite { components, .. } => components
                .iter()
                .filter_map(|c| Some(self.bbox(c.glyph_id, depth + 1)?.translate(c.dx, c.dy)))
                .reduce(BBox::union),
        }
    }

    /// The left side bearings: the `xMin` of each glyph.
    pub fn lsbs(&self) -> Vec<i16> {
        self.bboxes().iter().map(|b| b.map_or(0, |b| b.x_min)).collect()
    }

    pub fn build(&self) -> Vec<u8> {
        self.tables().assemble()
    }

    pub fn tables(&self) -> Tables {
        let bboxes = self.bboxes();
        let num_glyphs = self.glyphs.len() as u16;
        let num_h_metrics = self.num_h_metrics();

        // glyf + loca
        let mut glyf = vec![];
        let mut offsets = vec![];
        for (glyph, bbox) in self.glyphs.iter().zip(&bboxes) {
            offsets.push(glyf.len());
            glyf.extend(encode_glyph(glyph, bbox.unwrap_or_default()));
            while glyf.len() % 4 != 0 {
                glyf.push(0);
            }
        }
        offsets.push(glyf.len());

        let mut loca = vec![];
        for offset in offsets {
            if self.short_loca {
                loca.extend(((offset / 2) as u16).to_be_bytes());
            } else {
                loca.extend((offset as u32).to_be_bytes());
            }
        }

        let mut head = vec![0; 54];
        head[0..4].copy_from_slice(&0x00010000u32.to_be_bytes());
        head[4..8].copy_from_slice(&0x00010000u32.to_be_bytes());
        head[12..16].copy_from_slice(&0x5F0F3CF5u32.to_be_bytes());
        head[16..18].copy_from_slice(&0x000Bu16.to_be_bytes());
        head[18..20].copy_from_slice(&self.units_per_em.to_be_bytes());
        head[48..50].copy_from_slice(&2i16.to_be_bytes());
        head[50..52].copy_from_slice(&(if self.short_loca { 0u16 } else { 1 }).to_be_bytes());

        let mut hhea = vec![0; 36];
        hhea[0..4].copy_from_slice(&0x00010000u32.to_be_bytes());
        hhea[4..6].copy_from_slice(&1900i16.to_be_bytes());
        hhea[6..8].copy_from_slice(&(-500i16).to_be_bytes());
        hhea[8..10].copy_from_slice(&67i16.to_be_bytes());
        let max_advance = self.advances.iter().copied().max().unwrap_or(0);
        hhea[10..12].copy_from_slice(&max_advance.to_be_bytes());
        hhea[18..20].copy_from_slice(&1i16.to_be_bytes());
        hhea[34..36].copy_from_slice(&num_h_metrics.to_be_bytes());

        let mut hmtx = vec![];
        for (i, lsb) in self.lsbs().into_iter().enumerate() {
            if i < usize::from(num_h_metrics) {
                hmtx.extend(self.advances[i].to_be_bytes());
            }
            hmtx.extend(lsb.to_be_bytes());
        }

        let mut maxp = vec![0; 32];
        maxp[0..4].copy_from_slice(&0x00010000u32.to_be_bytes());
        maxp[4..6].copy_from_slice(&num_glyphs.to_be_bytes());

        // Version 2 with all glyphs named .notdef.
        let mut post = vec![0; 32];
        post[0..4].copy_from_slice(&0x00020000u32.to_be_bytes());
        post[8..10].copy_from_slice(&(-100i16).to_be_bytes());
        post[10..12].copy_from_slice(&50i16.to_be_bytes());
        post.extend(num_glyphs.to_be_bytes());
        post.extend(vec![0; 2 * usize::from(num_glyphs)]);

        let mut tables = vec![
            (Tag::new(b"glyf"), glyf),
            (Tag::new(b"loca"), loca),
            (Tag::new(b"head"), head),
            (Tag::new(b"hhea"), hhea),
            (Tag::new(b"hmtx"), hmtx),
            (Tag::new(b"maxp"), maxp),
            (Tag::new(b"post"), post),
            (Tag::new(b"cmap"), cmap_table(&self.cmap, self.full_cmap)),
        ];

        if let Some(name) = &self.postscript_name {
            tables.push((Tag::new(b"name"), name_table(name)));
        }

        tables.extend(self.extra_tables.iter().cloned());

        Tables {
            tables,
            flavor: self.flavor,
            num_h_metrics,
            index_format: if self.short_loca { 0 } else { 1 },
        }
    }
}

fn encode_glyph(glyph: &Glyph, bbox: BBox) -> Vec<u8> {
    let mut out = vec![];
    match glyph {
        Glyph::Empty => {}
        Glyph::Simple { contours, instructions } => {
            out.extend((contours.len() as i16).to_be_bytes());
            bbox.write(&mut out);
            let mut end = -1i32;
            for contour in contours {
                end += contour.len() as i32;
                out.extend((end as u16).to_be_bytes());
            }
            out.extend((instructions.len() as u16).to_be_bytes());
            out.extend(instructions);
            let points: Vec<_> = contours.iter().flatten().copied().collect();
            encode_points(&points, &mut out);
        }
        Glyph::Composite { components, instructions } => {
            out.extend((-1i16).to_be_bytes());
            bbox.write(&mut out);
            out.extend(composite_records(components, instructions));
            if !instructions.is_empty() {
                out.extend((instructions.len() as u16).to_be_bytes());
                out.extend(instructions);
            }
        }
    }
    out
}

fn composite_records(components: &[Component], instructions: &[u8]) -> Vec<u8> {
    let mut out = vec![];
    for (i, c) in components.iter().enumerate() {
        let last = i + 1 == components.len();
        let mut flags = ARG_1_AND_2_ARE_WORDS | ARGS_ARE_XY_VALUES;
        if c.scale.is_some() {
            flags |= WE_HAVE_A_SCALE;
        }
        if !last {
            flags |= MORE_COMPONENTS;
        }
        if last && !instructions.is_empty() {
            flags |= WE_HAVE_INSTRUCTIONS;
        }
        out.extend(flags.to_be_bytes());
        out.extend(c.glyph_id.to_be_bytes());
        out.extend(c.dx.to_be_bytes());
        out.extend(c.dy.to_be_bytes());
        if let Some(scale) = c.scale {
            out.extend(scale.to_be_bytes());
        }
    }
    out
}

/// Flags and coordinates, with run-length compressed flags and short
/// vectors wherever possible.
fn encode_points(points: &[(i16, i16, bool)], out: &mut Vec<u8>) {
    let mut flags: Vec<u8> = vec![];
    let mut xs = vec![];
    let mut ys = vec![];
    let mut last_flag = None;
    let mut repeat = 0u8;
    let (mut last_x, mut last_y) = (0i32, 0i32);

    for &(x, y, on_curve) in points {
        let mut flag = u8::from(on_curve);
        flag |= delta(i32::from(x) - last_x, 0x02, 0x10, &mut xs);
        flag |= delta(i32::from(y) - last_y, 0x04, 0x20, &mut ys);

        if last_flag == Some(flag) && repeat != u8::MAX {
            *flags.last_mut().unwrap() |= 0x08;
            repeat += 1;
        } else {
            if repeat != 0 {
                flags.push(repeat);
                repeat = 0;
            }
            flags.push(flag);
        }

        last_flag = Some(flag);
        last_x = i32::from(x);
        last_y = i32::from(y);
    }

    if repeat != 0 {
        flags.push(repeat);
    }

    out.extend(flags);
    out.extend(xs);
    out.extend(ys);
}

fn delta(d: i32, short: u8, same_or_positive: u8, out: &mut Vec<u8>) -> u8 {
    if d == 0 {
        same_or_positive
    } else if (-255..=255).contains(&d) {
        out.push(d.unsigned_abs() as u8);
        short | if d > 0 { same_or_positive } else { 0 }
    } else {
        out.extend((d as i16).to_be_bytes());
        0
    }
}

/// A cmap with a Windows BMP format 4 subtable and optionally a Unicode
/// format 12 subtable.
pub fn cmap_table(mappings: &[(u32, u16)], full: bool) -> Vec<u8> {
    let mut bmp: Vec<(u16, u16)> = mappings
        .iter()
        .filter_map(|&(c, g)| Some((u16::try_from(c).ok()?, g)))
        .collect();
    bmp.sort();

    let mut all = mappings.to_vec();
    all.sort();

    let mut subtables = vec![(3u16, 1u16, format4(&bmp))];
    if full {
        subtables.insert(0, (0, 4, format12(&all)));
    }
    cmap_with(&subtables)
}

/// A cmap from raw subtables.
pub fn cmap_with(subtables: &[(u16, u16, Vec<u8>)]) -> Vec<u8> {
    let mut out = vec![];
    out.extend(0u16.to_be_bytes());
    out.extend((subtables.len() as u16).to_be_bytes());
    let mut offset = 4 + 8 * subtables.len() as u32;
    for (platform, encoding, data) in subtables {
        out.extend(platform.to_be_bytes());
        out.extend(encoding.to_be_bytes());
        out.extend(offset.to_be_bytes());
        offset += data.len() as u32;
    }
    for (_, _, data) in subtables {
        out.extend(data);
    }
    out
}

/// One delta segment per code point, plus the final one.
pub fn format4(mappings: &[(u16, u16)]) -> Vec<u8> {
    let seg_count = mappings.len() as u16 + 1;
    let mut ends = vec![];
    let mut starts = vec![];
    let mut deltas = vec![];
    for &(c, g) in mappings {
        ends.push(c);
        starts.push(c);
        deltas.push(g.wrapping_sub(c));
    }
    ends.push(0xFFFF);
    starts.push(0xFFFF);
    deltas.push(1);

    let mut out = vec![];
    for v in [4, 16 + 8 * seg_count, 0, 2 * seg_count, 2, 0, 0] {
        out.extend(v.to_be_bytes());
    }
    ends.iter().for_each(|v| out.extend(v.to_be_bytes()));
    out.extend(0u16.to_be_bytes());
    starts.iter().for_each(|v| out.extend(v.to_be_bytes()));
    deltas.iter().for_each(|v| out.extend(v.to_be_bytes()));
    (0..seg_count).for_each(|_| out.extend(0u16.to_be_bytes()));
    out
}

/// One group per code point.
pub fn format12(mappings: &[(u32, u16)]) -> Vec<u8> {
    let mut out = vec![];
    out.extend(12u16.to_be_bytes());
    out.extend(0u16.to_be_bytes());
    out.extend((16 + 12 * mappings.len() as u32).to_be_bytes());
    out.extend(0u32.to_be_bytes());
    out.extend((mappings.len() as u32).to_be_bytes());
    for &(c, g) in mappings {
        out.extend(c.to_be_bytes());
        out.extend(c.to_be_bytes());
        out.extend(u32::from(g).to_be_bytes());
    }
    out
}

fn name_table(postscript_name: &str) -> Vec<u8> {
    let string: Vec<u8> = postscript_name.encode_utf16().flat_map(u16::to_be_bytes).collect();
    let mut out = vec![];
    for v in [0u16, 1, 18, 3, 1, 0x409, 6, string.len() as u16, 0] {
        out.extend(v.to_be_bytes());
    }
    out.extend(string);
    out
}

/// How to encode a WOFF2 file.
#[derive(Debug, Clone, Default)]
pub struct Woff2Options {
    pub transform_glyf: bool,
    pub transform_hmtx: bool,
    pub metadata: Option<Vec<u8>>,
}

impl Woff2Options {
    pub fn transformed() -> Self {
        Self { transform_glyf: true, transform_hmtx: true, metadata: None }
    }
}

const KNOWN_TAG_INDICES: [(&[u8; 4], u8); 10] = [
    (b"cmap", 0),
    (b"head", 1),
    (b"hhea", 2),
    (b"hmtx", 3),
    (b"maxp", 4),
    (b"name", 5),
    (b"OS/2", 6),
    (b"post", 7),
    (b"glyf", 10),
    (b"loca", 11),
];

/// Encode a font as WOFF2. The table data is stored as is, so the file
/// must be read with a pass-through decompressor, or wrapped with
/// [`brotli_stored`] first.
pub fn woff2(builder: &FontBuilder, options: &Woff2Options) -> Vec<u8> {
    woff2_with(builder, options, |data| data.to_vec())
}

/// Encode a font as WOFF2, compressing the table data with `compress`.
pub fn woff2_with(
    builder: &FontBuilder,
    options: &Woff2Options,
    compress: impl Fn(&[u8]) -> Vec<u8>,
) -> Vec<u8> {
    let tables = builder.tables();
    let mut sorted = tables.tables.clone();
    sorted.sort_by_key(|(tag, _)| *tag);

    let mut directory = vec![];
    let mut stream = vec![];
    for (tag, data) in &sorted {
        let index = KNOWN_TAG_INDICES
            .iter()
            .find(|(known, _)| Tag::new(known) == *tag)
            .map_or(63, |&(_, index)| index);

        let is_glyf = tag.0 == *b"glyf" || tag.0 == *b"loca";
        let (version, stored): (u8, Option<Vec<u8>>) = if is_glyf && options.transform_glyf {
            let stored = if tag.0 == *b"glyf" {
                transform_glyf(builder, tables.index_format)
            } else {
                vec![]
            };
            (0, Some(stored))
        } else if is_glyf {
            (3, None)
        } else if tag.0 == *b"hmtx" && options.transform_hmtx {
            (1, Some(transform_hmtx(builder)))
        } else {
            (0, None)
        };

        directory.push(index | (version << 6));
        if index == 63 {
            directory.extend(tag.0);
        }
        directory.extend(base128(data.len() as u32));
        match stored {
            Some(stored) => {
                directory.extend(base128(stored.len() as u32));
                stream.extend(stored);
            }
            None => stream.extend(data),
        }
    }

    let compressed = compress(&stream);
    let sfnt_size = tables.assemble().len() as u32;

    let mut out = vec![];
    out.extend(WOFF2_MAGIC.to_be_bytes());
    out.extend(tables.flavor.to_be_bytes());
    out.extend(0u32.to_be_bytes()); // length, patched below
    out.extend((sorted.len() as u16).to_be_bytes());
    out.extend(0u16.to_be_bytes());
    out.extend(sfnt_size.to_be_bytes());
    out.extend((compressed.len() as u32).to_be_bytes());
    out.extend(1u16.to_be_bytes());
    out.extend(0u16.to_be_bytes());

    let meta_offset_pos = out.len();
    out.extend([0; 20]); // metadata and private block
    out.extend(directory);
    out.extend(compressed);

    if let Some(metadata) = &options.metadata {
        while out.len() % 4 != 0 {
            out.push(0);
        }
        let offset = out.len() as u32;
        let len = metadata.len() as u32;
        out[meta_offset_pos..meta_offset_pos + 4].copy_from_slice(&offset.to_be_bytes());
        out[meta_offset_pos + 4..meta_offset_pos + 8].copy_from_slice(&len.to_be_bytes());
        out[meta_offset_pos + 8..meta_offset_pos + 12].copy_from_slice(&len.to_be_bytes());
        out.extend(metadata);
    }

    let len = out.len() as u32;
    out[8..12].copy_from_slice(&len.to_be_bytes());
    out
}

/// The transformed glyf table. No glyph needs an explicit bounding box
/// except for composites.
fn transform_glyf(builder: &FontBuilder, index_format: u16) -> Vec<u8> {
    let num_glyphs = builder.glyphs.len();
    let bboxes = builder.bboxes();

    let mut n_contour = vec![];
    let mut n_points = vec![];
    let mut flags = vec![];
    let mut glyphs = vec![];
    let mut composites = vec![];
    let mut bbox_bitmap = vec![0u8; ((num_glyphs + 31) / 32) * 4];
    let mut bbox_stream = vec![];
    let mut instruction_stream = vec![];

    for (i, glyph) in builder.glyphs.iter().enumerate() {
        match glyph {
            Glyph::Empty => n_contour.extend(0u16.to_be_bytes()),
            Glyph::Simple { contours, instructions } => {
                n_contour.extend((contours.len() as u16).to_be_bytes());
                let (mut last_x, mut last_y) = (0i32, 0i32);
                for contour in contours {
                    n_points.extend(packed_u16(contour.len() as u16));
                    for &(x, y, on_curve) in contour {
                        let (dx, dy) = (i32::from(x) - last_x, i32::from(y) - last_y);
                        let (flag, data) = triplet(dx, dy, on_curve);
                        flags.push(flag);
                        glyphs.extend(data);
                        last_x = i32::from(x);
                        last_y = i32::from(y);
                    }
                }
                glyphs.extend(packed_u16(instructions.len() as u16));
                instruction_stream.extend(instructions);
            }
            Glyph::Composite { components, instructions } => {
                n_contour.extend(0xFFFFu16.to_be_bytes());
                composites.extend(composite_records(components, instructions));
                bbox_bitmap[i / 8] |= 0x80 >> (i % 8);
                bboxes[i].unwrap_or_default().write(&mut bbox_stream);
                if !instructions.is_empty() {
                    glyphs.extend(packed_u16(instructions.len() as u16));
                    instruction_stream.extend(instructions);
                }
            }
        }
    }

    let mut bbox = bbox_bitmap;
    bbox.extend(bbox_stream);

    let mut out = vec![];
    out.extend(0u16.to_be_bytes()); // version
    out.extend(0u16.to_be_bytes()); // option flags
    out.extend((num_glyphs as u16).to_be_bytes());
    out.extend(index_format.to_be_bytes());
    let streams = [n_contour, n_points, flags, glyphs, composites, bbox, instruction_stream];
    for stream in &streams {
        out.extend((stream.len() as u32).to_be_bytes());
    }
    for stream in streams {
        out.extend(stream);
    }
    out
}

/// The transformed hmtx table. The proportional side bearings are dropped,
/// the monospace ones are kept.
fn transform_hmtx(builder: &FontBuilder) -> Vec<u8> {
    let num_h_metrics = usize::from(builder.num_h_metrics());
    let mut out = vec![0x01];
    for &advance in &builder.advances[..num_h_metrics] {
        out.extend(advance.to_be_bytes());
    }
    for lsb in &builder.lsbs()[num_h_metrics..] {
        out.extend(lsb.to_be_bytes());
    }
    out
}

/// Encode a point delta as a flag byte and its coordinate bytes.
fn triplet(dx: i32, dy: i32, on_curve: bool) -> (u8, Vec<u8>) {
    let on = if on_curve { 0 } else { 0x80 };
    let (ax, ay) = (dx.unsigned_abs(), dy.unsigned_abs());
    let x_sign = u32::from(dx >= 0);
    let y_sign = u32::from(dy >= 0);
    let xy_signs = x_sign + 2 * y_sign;

    let (flag, data) = if dx == 0 && ay < 1280 {
        (((ay & 0xF00) >> 7) + y_sign, vec![ay as u8])
    } else if dy == 0 && ax < 1280 {
        (10 + ((ax & 0xF00) >> 7) + x_sign, vec![ax as u8])
    } else if ax < 65 && ay < 65 {
        let flag = 20 + ((ax - 1) & 0x30) + (((ay - 1) & 0x30) >> 2) + xy_signs;
        (flag, vec![((((ax - 1) & 0x0F) << 4) | ((ay - 1) & 0x0F)) as u8])
    } else if ax < 769 && ay < 769 {
        let flag = 84 + 12 * (((ax - 1) & 0x300) >> 8) + (((ay - 1) & 0x300) >> 6) + xy_signs;
        (flag, vec![(ax - 1) as u8, (ay - 1) as u8])
    } else if ax < 4096 && ay < 4096 {
        let data = vec![(ax >> 4) as u8, (((ax & 0x0F) << 4) | (ay >> 8)) as u8, ay as u8];
        (120 + xy_signs, data)
    } else {
        let data = vec![(ax >> 8) as u8, ax as u8, (ay >> 8) as u8, ay as u8];
        (124 + xy_signs, data)
    };

    (on | flag as u8, data)
}

pub fn packed_u16(value: u16) -> Vec<u8> {
    match value {
        0..=252 => vec![value as u8],
        253..=505 => vec![255, (value - 253) as u8],
        506..=761 => vec![254, (value - 506) as u8],
        _ => {
            let [hi, lo] = value.to_be_bytes();
            vec![253, hi, lo]
        }
    }
}

pub fn base128(mut value: u32) -> Vec<u8> {
    let mut groups = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        groups.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    groups.reverse();
    groups
}

/// A pass-through decompressor for files built with [`woff2`].
pub fn stored(data: &[u8], _: usize) -> fontembed::Result<Vec<u8>> {
    Ok(data.to_vec())
}

/// A brotli stream holding `data` in a single uncompressed meta-block.
pub fn brotli_stored(data: &[u8]) -> Vec<u8> {
    assert!(!data.is_empty() && data.len() <= 1 << 16);
    // WBITS = 16, ISLAST = 0, MNIBBLES = 4, MLEN - 1, ISUNCOMPRESSED = 1.
    let header = ((data.len() as u32 - 1) << 4) | (1 << 20);
    let mut out = header.to_le_bytes()[..3].to_vec();
    out.extend_from_slice(data);
    // ISLAST = 1, ISLASTEMPTY = 1.
    out.push(0x03);
    out
}

/// Read a big-endian u16.
pub fn u16_at(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

/// Read a big-endian u32.
pub fn u32_at(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(data[offset..offset + 4].try_into().unwrap())
}
