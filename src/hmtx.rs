use super::*;
use crate::metrics::GlyphMetrics;

/// Read the horizontal metrics of all glyphs.
///
/// Glyphs past the last long metric reuse its advance and only store their
/// left side bearing.
pub(crate) fn parse(
    hmtx: &[u8],
    num_h_metrics: u16,
    num_glyphs: u16,
) -> Result<Vec<GlyphMetrics>> {
    if num_h_metrics == 0 && num_glyphs > 0 {
        return Err(Error::invalid("hhea table", "numberOfHMetrics is zero"));
    }

    let num_h_metrics = num_h_metrics.min(num_glyphs);
    let mut r = Reader::named(hmtx, "hmtx table");
    let mut metrics = Vec::with_capacity(usize::from(num_glyphs));

    for _ in 0..num_h_metrics {
        let advance_width = r.read::<u16>()?;
        let left_side_bearing = r.read::<i16>()?;
        metrics.push(GlyphMetrics { advance_width, left_side_bearing });
    }

    let last_advance = metrics.last().map_or(0, |m| m.advance_width);
    for _ in num_h_metrics..num_glyphs {
        let left_side_bearing = r.read::<i16>()?;
        metrics.push(GlyphMetrics { advance_width: last_advance, left_side_bearing });
    }

    Ok(metrics)
}

/// Subset the `hmtx` table.
///
/// The metrics are written in the order of the new glyph IDs, with zeroes for
/// the empty placeholders of the identity encoding. Trailing glyphs with the
/// same advance are stored in the short format.
pub(crate) fn subset(ctx: &mut Context) -> Result<()> {
    let num_h_metrics = {
        let hhea = ctx.expect_table(Tag::HHEA)?;
        hhea::Hhea::parse(hhea)?.num_h_metrics
    };

    let hmtx = ctx.expect_table(Tag::HMTX)?;
    let metrics = parse(hmtx, num_h_metrics, ctx.num_glyphs)?;

    let sub_metrics: Vec<GlyphMetrics> = ctx
        .mapper
        .remapped_gids()
        .map(|old_gid| match old_gid {
            Some(gid) => metrics[usize::from(gid)],
            None => GlyphMetrics::default(),
        })
        .collect();

    // Collapse the run of equal advances at the end.
    let mut sub_num_h_metrics = sub_metrics.len();
    while sub_num_h_metrics > 1
        && sub_metrics[sub_num_h_metrics - 1].advance_width
            == sub_metrics[sub_num_h_metrics - 2].advance_width
    {
        sub_num_h_metrics -= 1;
    }

    let mut sub_hmtx = Writer::with_capacity(4 * sub_metrics.len());
    for (i, metric) in sub_metrics.iter().enumerate() {
        if i < sub_num_h_metrics {
            sub_hmtx.write::<u16>(metric.advance_width);
        }
        sub_hmtx.write::<i16>(metric.left_side_bearing);
    }

    log::trace!(
        "hmtx: {} long metrics for {} glyphs",
        sub_num_h_metrics,
        sub_metrics.len()
    );

    // The subset has at most 65535 glyphs.
    ctx.num_h_metrics = Some(sub_num_h_metrics as u16);
    ctx.push(Tag::HMTX, sub_hmtx.finish());

    Ok(())
}
