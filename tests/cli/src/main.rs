use fontembed::{Font, GlyphEncoding};
use std::env;

fn parse_gids(gids: &str) -> Vec<u16> {
    if gids == "*" {
        return (0..u16::MAX).collect();
    }

    let split = gids.split(',').filter(|s| !s.is_empty()).collect::<Vec<_>>();
    let mut gids = vec![];

    for el in &split {
        if el.contains('-') {
            let range = el.split('-').collect::<Vec<_>>();
            let first = range[0].parse::<u16>().unwrap();
            let second = range[1].parse::<u16>().unwrap();

            gids.extend(first..=second);
        } else {
            gids.push(el.parse::<u16>().unwrap());
        }
    }

    gids
}

// An experimental CLI for trying out fonts by hand:
// cli <font.ttf|font.woff2> [out.ttf] [gids] [sequential]
fn main() {
    let args: Vec<String> = env::args().collect();
    let data = std::fs::read(&args[1]).unwrap();
    let gids = parse_gids(args.get(3).map(String::as_str).unwrap_or("0-5"));
    let encoding = match args.get(4).map(String::as_str) {
        Some("sequential") => GlyphEncoding::Sequential,
        _ => GlyphEncoding::Identity,
    };

    let font = if data.starts_with(b"wOF2") {
        Font::from_woff2(&data).unwrap()
    } else {
        Font::new(data).unwrap()
    };

    let gids: Vec<u16> = gids.into_iter().filter(|&gid| gid < font.glyph_count()).collect();
    let subset = font.pdf_subset(&gids, encoding).unwrap();

    println!("BaseFont: /{}", subset.name());
    println!("W: {}", subset.cid_widths());

    std::fs::write(args.get(2).map(String::as_str).unwrap_or("res.ttf"), subset.font_file())
        .unwrap();
}
