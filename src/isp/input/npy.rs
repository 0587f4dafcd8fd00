//! Serialized numpy array reader (.npy and .npz).
//!
//! An .npz archive is a zip container of .npy members; the first array
//! member is taken. Supported dtypes are u8, little-endian u16, f32 and f64,
//! C-order, with shape (H, W) or (H, W, 3).

use std::fs;
use std::io::Read;
use std::path::Path;

use crate::isp::common::{IspError, Result};
use crate::isp::frame::Frame;
use crate::isp::input::types::{DecodedFrame, SourceKind};

pub(super) fn read(path: &Path) -> Result<DecodedFrame> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let bytes = if ext == "npz" {
        read_npz_member(path)?
    } else {
        fs::read(path)?
    };
    let frame =
        parse_npy(&bytes).map_err(|e| IspError::Decode(format!("{}: {e}", path.display())))?;
    Ok(DecodedFrame {
        frame,
        kind: SourceKind::Npy,
        bpp: None,
        camera: None,
    })
}

fn read_npz_member(path: &Path) -> Result<Vec<u8>> {
    let file = fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| IspError::Decode(format!("{}: {e}", path.display())))?;
    let index = (0..archive.len())
        .find(|&i| {
            archive
                .by_index(i)
                .map(|m| m.name().ends_with(".npy"))
                .unwrap_or(false)
        })
        .ok_or_else(|| {
            IspError::Decode(format!("{}: archive holds no .npy member", path.display()))
        })?;
    let mut member = archive
        .by_index(index)
        .map_err(|e| IspError::Decode(format!("{}: {e}", path.display())))?;
    let mut bytes = Vec::new();
    member.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn parse_npy(bytes: &[u8]) -> std::result::Result<Frame, String> {
    const MAGIC: &[u8] = b"\x93NUMPY";
    if bytes.len() < 10 || &bytes[..6] != MAGIC {
        return Err("not an npy array".into());
    }
    let major = bytes[6];
    let (header_start, header_len) = match major {
        1 => (10, u16::from_le_bytes([bytes[8], bytes[9]]) as usize),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err("truncated header".into());
            }
            (
                12,
                u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize,
            )
        }
        v => return Err(format!("unsupported npy version {v}")),
    };
    let data_start = header_start + header_len;
    if bytes.len() < data_start {
        return Err("truncated header".into());
    }
    let header = &bytes[header_start..data_start];
    let header = std::str::from_utf8(header).map_err(|_| "invalid header".to_string())?;

    if header.contains("'fortran_order': True") {
        return Err("fortran-order arrays are not supported".into());
    }
    let descr = quoted_field(header, "descr").ok_or("missing dtype")?;
    let shape = shape_field(header)?;
    let (height, width, channels) = match shape.as_slice() {
        [h, w] => (*h, *w, 1),
        [h, w, 3] => (*h, *w, 3),
        other => return Err(format!("unsupported array shape {other:?}")),
    };

    let samples = width * height * channels;
    let raster = &bytes[data_start..];
    let data: Vec<f32> = match descr {
        "|u1" | "<u1" => {
            check_len(raster.len(), samples)?;
            raster[..samples].iter().map(|&v| v as f32).collect()
        }
        "<u2" => {
            check_len(raster.len(), samples * 2)?;
            raster[..samples * 2]
                .chunks_exact(2)
                .map(|p| u16::from_le_bytes([p[0], p[1]]) as f32)
                .collect()
        }
        "<f4" => {
            check_len(raster.len(), samples * 4)?;
            raster[..samples * 4]
                .chunks_exact(4)
                .map(|q| f32::from_le_bytes([q[0], q[1], q[2], q[3]]))
                .collect()
        }
        "<f8" => {
            check_len(raster.len(), samples * 8)?;
            raster[..samples * 8]
                .chunks_exact(8)
                .map(|o| {
                    f64::from_le_bytes([o[0], o[1], o[2], o[3], o[4], o[5], o[6], o[7]]) as f32
                })
                .collect()
        }
        other => return Err(format!("unsupported dtype '{other}'")),
    };
    Ok(Frame::new(width, height, channels, data))
}

fn check_len(actual: usize, expected: usize) -> std::result::Result<(), String> {
    if actual < expected {
        Err(format!("truncated: {actual} of {expected} bytes"))
    } else {
        Ok(())
    }
}

fn quoted_field<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let start = header.find(&format!("'{key}'"))?;
    let rest = &header[start..];
    let open = rest.find(": '")? + 3;
    let close = rest[open..].find('\'')? + open;
    Some(&rest[open..close])
}

fn shape_field(header: &str) -> std::result::Result<Vec<usize>, String> {
    let start = header.find('(').ok_or("missing shape")?;
    let end = header[start..].find(')').ok_or("missing shape")? + start;
    header[start + 1..end]
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<usize>().map_err(|_| format!("bad shape dim '{t}'")))
        .collect()
}
