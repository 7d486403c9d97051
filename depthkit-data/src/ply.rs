//! ASCII PLY export for accumulated point clouds.

use crate::types::CloudPoint;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Write points as an ASCII PLY file with 8-bit vertex colors.
///
/// Returns the number of vertices written.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn write_ascii_ply<P: AsRef<Path>>(path: P, points: &[CloudPoint]) -> std::io::Result<usize> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    write_ply_to(&mut writer, points)?;
    writer.flush()?;

    info!("Wrote {} points", points.len());
    Ok(points.len())
}

fn write_ply_to<W: Write>(writer: &mut W, points: &[CloudPoint]) -> std::io::Result<()> {
    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "comment generated by depthkit")?;
    writeln!(writer, "element vertex {}", points.len())?;
    for axis in ["x", "y", "z"] {
        writeln!(writer, "property float {axis}")?;
    }
    for channel in ["red", "green", "blue"] {
        writeln!(writer, "property uchar {channel}")?;
    }
    writeln!(writer, "end_header")?;

    for point in points {
        let [r, g, b] = point.color_u8();
        writeln!(
            writer,
            "{} {} {} {} {} {}",
            point.position.x, point.position.y, point.position.z, r, g, b
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use tempfile::tempdir;

    #[test]
    fn test_header_and_body() {
        let points = [
            CloudPoint::new(Vec3::new(0.5, 1.0, -2.0), Vec3::new(1.0, 0.0, 0.0)),
            CloudPoint::white(Vec3::ZERO),
        ];
        let mut out = Vec::new();
        write_ply_to(&mut out, &points).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("ply\nformat ascii 1.0\n"));
        assert!(text.contains("element vertex 2\n"));
        let body: Vec<&str> = text.split("end_header\n").nth(1).unwrap().lines().collect();
        assert_eq!(body, vec!["0.5 1 -2 255 0 0", "0 0 0 255 255 255"]);
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cloud.ply");
        let written = write_ascii_ply(&path, &[CloudPoint::white(Vec3::ONE)]).unwrap();
        assert_eq!(written, 1);
        assert!(std::fs::read_to_string(&path).unwrap().ends_with("1 1 1 255 255 255\n"));
    }
}
