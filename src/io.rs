//! Point-file ingestion and SVG export.
//!
//! Point files are comma-separated rows `path_id, subpath_id, x, y`.
//! Ids may be written as floats; rows are grouped by id in order of first
//! appearance, so a path whose rows are interleaved with another's is
//! still reassembled.

use std::path::Path;

use kurbo::Point;
use log::info;
use svg::node::element::path::Data;
use svg::node::element::{Group, Path as SvgPath};
use svg::Document;

use crate::error::RegularizeError;
use crate::shape::Polyline;

/// A path: one or more sub-path polylines.
pub type PathGroup = Vec<Polyline>;

/// Read a point file into paths of polylines.
pub fn read_paths(path: &Path) -> Result<Vec<PathGroup>, RegularizeError> {
    let text = std::fs::read_to_string(path)?;
    let groups = parse_paths(&text)?;
    info!(
        "read {} paths ({} polylines) from {}",
        groups.len(),
        groups.iter().map(Vec::len).sum::<usize>(),
        path.display()
    );
    Ok(groups)
}

/// Parse point-file text. Blank lines and `#` comments are skipped.
pub fn parse_paths(text: &str) -> Result<Vec<PathGroup>, RegularizeError> {
    let mut paths: Vec<(u64, Vec<(u64, Vec<Point>)>)> = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line_no = index + 1;
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 4 {
            return Err(RegularizeError::Parse {
                line: line_no,
                reason: format!("expected 4 columns, found {}", fields.len()),
            });
        }
        let mut values = [0.0; 4];
        for (value, field) in values.iter_mut().zip(&fields) {
            *value = field.parse::<f64>().map_err(|e| RegularizeError::Parse {
                line: line_no,
                reason: format!("{:?}: {}", field, e),
            })?;
            if !value.is_finite() {
                return Err(RegularizeError::Parse {
                    line: line_no,
                    reason: format!("{:?} is not finite", field),
                });
            }
        }
        let [path_id, sub_id, x, y] = values;
        let (path_key, sub_key) = (path_id.to_bits(), sub_id.to_bits());

        let subpaths = match paths.iter().position(|(id, _)| *id == path_key) {
            Some(i) => &mut paths[i].1,
            None => {
                paths.push((path_key, Vec::new()));
                let last = paths.len() - 1;
                &mut paths[last].1
            }
        };
        match subpaths.iter_mut().find(|(id, _)| *id == sub_key) {
            Some((_, points)) => points.push(Point::new(x, y)),
            None => subpaths.push((sub_key, vec![Point::new(x, y)])),
        }
    }

    paths
        .into_iter()
        .map(|(_, subpaths)| {
            subpaths
                .into_iter()
                .map(|(_, points)| Polyline::new(points))
                .collect()
        })
        .collect()
}

/// Build an SVG document for the paths.
///
/// One `<g>` per path and one move-to/line-to `<path>` per polyline. The
/// canvas is the largest coordinate plus 10 % padding.
pub fn to_svg(paths: &[PathGroup]) -> Document {
    let (mut max_x, mut max_y) = (0.0f64, 0.0f64);
    for p in paths.iter().flatten().flat_map(|pl| pl.points()) {
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let pad = |v: f64| ((v * 1.1 * 100.0).round() / 100.0).max(1.0);
    let (width, height) = (pad(max_x), pad(max_y));

    let mut doc = Document::new()
        .set("width", width)
        .set("height", height)
        .set("viewBox", (0, 0, width, height));
    for (i, group) in paths.iter().enumerate() {
        let mut g = Group::new().set("id", format!("path-{}", i));
        for polyline in group {
            g = g.add(
                SvgPath::new()
                    .set("d", path_data(polyline))
                    .set("fill", "none")
                    .set("stroke", "black")
                    .set("stroke-width", 2),
            );
        }
        doc = doc.add(g);
    }
    doc
}

fn path_data(polyline: &Polyline) -> Data {
    let xy = |p: &Point| (p.x as f32, p.y as f32);
    let Some((first, rest)) = polyline.points().split_first() else {
        return Data::new();
    };
    rest.iter()
        .fold(Data::new().move_to(xy(first)), |d, p| d.line_to(xy(p)))
}

/// Write paths to an SVG file.
pub fn write_svg(paths: &[PathGroup], output: &Path) -> Result<(), RegularizeError> {
    svg::save(output, &to_svg(paths))?;
    info!("wrote {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_by_first_appearance() {
        let text = "\
0.0,0.0,1.0,2.0
1.0,0.0,5.0,5.0
0.0,0.0,3.0,4.0
0.0,1.0,9.0,9.0
1.0,0.0,6.0,6.0
";
        let paths = parse_paths(text).unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].len(), 2);
        assert_eq!(
            paths[0][0].points(),
            &[Point::new(1.0, 2.0), Point::new(3.0, 4.0)]
        );
        assert_eq!(paths[0][1].points(), &[Point::new(9.0, 9.0)]);
        assert_eq!(paths[1][0].len(), 2);
    }

    #[test]
    fn scientific_ids_and_blank_lines() {
        let text = "\n0.000000e+00, 0.000000e+00, 1.5, 2.5\n\n# note\n0.000000e+00,0.000000e+00,3,4\n";
        let paths = parse_paths(text).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0][0].len(), 2);
    }

    #[test]
    fn malformed_rows_report_their_line() {
        let err = parse_paths("0,0,1,2\n0,0,abc,2\n").unwrap_err();
        assert!(matches!(err, RegularizeError::Parse { line: 2, .. }));

        let err = parse_paths("0,0,1\n").unwrap_err();
        assert!(matches!(err, RegularizeError::Parse { line: 1, .. }));
    }

    #[test]
    fn svg_has_one_path_per_polyline() {
        let paths = parse_paths("0,0,0,0\n0,0,10,0\n0,1,0,5\n0,1,20,5\n").unwrap();
        let svg = to_svg(&paths).to_string();
        assert_eq!(svg.matches("<path").count(), 2);
        assert_eq!(svg.matches("<g ").count(), 1);
        assert!(svg.contains(r#"width="22""#));
        assert!(svg.contains(r#"viewBox="0 0 22 5.5""#));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("points.csv");
        std::fs::write(&csv, "0,0,1,1\n0,0,2,3\n").unwrap();
        let paths = read_paths(&csv).unwrap();
        let out = dir.path().join("out.svg");
        write_svg(&paths, &out).unwrap();
        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.contains("<svg"));
        assert!(written.trim_end().ends_with("</svg>"));
        assert_eq!(written.matches("<path").count(), 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_paths(&dir.path().join("nope.csv")),
            Err(RegularizeError::Io(_))
        ));
    }
}
