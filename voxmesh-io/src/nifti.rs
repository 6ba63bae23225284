//! NIfTI-1 volume loading
//!
//! Reads native endian NIfTI-1 images, either as a single `.nii` file or as
//! a `.hdr`/`.img` pair. Any of these may be gzip compressed (`.nii.gz`). Intensities are converted to
//! `f32` with the header's slope and intercept applied, and the voxel to
//! world affine is taken from the sform, then the qform, then the voxel
//! sizes.

use crate::error::VolumeError;
use byteorder::{ByteOrder, NativeEndian};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use voxmesh_core::{Matrix4, ScalarVolume, Transform3D};

/// Size in bytes of a NIfTI-1 header
pub const HEADER_SIZE: usize = 348;

/// Data offset used when writing single-file images (header plus an empty
/// extension flag).
const SINGLE_FILE_OFFSET: usize = 352;

const MAGIC_SINGLE: [u8; 4] = *b"n+1\0";
const MAGIC_PAIR: [u8; 4] = *b"ni1\0";

/// Voxel storage types this reader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datatype {
    UInt8,
    Int16,
    Float32,
    UInt16,
}

impl Datatype {
    pub fn from_code(code: i16) -> Result<Self, VolumeError> {
        match code {
            2 => Ok(Datatype::UInt8),
            4 => Ok(Datatype::Int16),
            16 => Ok(Datatype::Float32),
            512 => Ok(Datatype::UInt16),
            _ => Err(VolumeError::UnsupportedDatatype { code }),
        }
    }

    pub fn code(self) -> i16 {
        match self {
            Datatype::UInt8 => 2,
            Datatype::Int16 => 4,
            Datatype::Float32 => 16,
            Datatype::UInt16 => 512,
        }
    }

    pub fn bytes_per_voxel(self) -> usize {
        match self {
            Datatype::UInt8 => 1,
            Datatype::Int16 | Datatype::UInt16 => 2,
            Datatype::Float32 => 4,
        }
    }
}

/// The fields of a NIfTI-1 header that affect how a volume is read.
#[derive(Debug, Clone, PartialEq)]
pub struct NiftiHeader {
    pub dim: [i16; 8],
    pub datatype: i16,
    pub bitpix: i16,
    pub pixdim: [f32; 8],
    pub vox_offset: f32,
    pub scl_slope: f32,
    pub scl_inter: f32,
    pub cal_max: f32,
    pub cal_min: f32,
    pub qform_code: i16,
    pub sform_code: i16,
    /// Quaternion parameters b, c, d
    pub quatern: [f32; 3],
    pub qoffset: [f32; 3],
    pub srow_x: [f32; 4],
    pub srow_y: [f32; 4],
    pub srow_z: [f32; 4],
    pub magic: [u8; 4],
}

impl Default for NiftiHeader {
    fn default() -> Self {
        Self {
            dim: [3, 1, 1, 1, 1, 1, 1, 1],
            datatype: Datatype::Float32.code(),
            bitpix: 32,
            pixdim: [1.0; 8],
            vox_offset: SINGLE_FILE_OFFSET as f32,
            scl_slope: 1.0,
            scl_inter: 0.0,
            cal_max: 0.0,
            cal_min: 0.0,
            qform_code: 0,
            sform_code: 0,
            quatern: [0.0; 3],
            qoffset: [0.0; 3],
            srow_x: [1.0, 0.0, 0.0, 0.0],
            srow_y: [0.0, 1.0, 0.0, 0.0],
            srow_z: [0.0, 0.0, 1.0, 0.0],
            magic: MAGIC_SINGLE,
        }
    }
}

impl NiftiHeader {
    /// Parse a native endian header.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VolumeError> {
        if bytes.len() < HEADER_SIZE {
            return Err(VolumeError::InvalidHeader(format!(
                "header is {} bytes, expected {}",
                bytes.len(),
                HEADER_SIZE
            )));
        }

        let sizeof_hdr = NativeEndian::read_i32(&bytes[0..4]);
        if sizeof_hdr != HEADER_SIZE as i32 {
            if sizeof_hdr.swap_bytes() == HEADER_SIZE as i32 {
                return Err(VolumeError::ForeignEndian);
            }
            return Err(VolumeError::InvalidHeader(format!(
                "sizeof_hdr is {}, expected {}",
                sizeof_hdr, HEADER_SIZE
            )));
        }

        let mut dim = [0i16; 8];
        NativeEndian::read_i16_into(&bytes[40..56], &mut dim);
        let mut pixdim = [0f32; 8];
        NativeEndian::read_f32_into(&bytes[76..108], &mut pixdim);
        let mut srow_x = [0f32; 4];
        let mut srow_y = [0f32; 4];
        let mut srow_z = [0f32; 4];
        NativeEndian::read_f32_into(&bytes[280..296], &mut srow_x);
        NativeEndian::read_f32_into(&bytes[296..312], &mut srow_y);
        NativeEndian::read_f32_into(&bytes[312..328], &mut srow_z);
        let mut quatern = [0f32; 3];
        let mut qoffset = [0f32; 3];
        NativeEndian::read_f32_into(&bytes[256..268], &mut quatern);
        NativeEndian::read_f32_into(&bytes[268..280], &mut qoffset);
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[344..348]);

        Ok(Self {
            dim,
            datatype: NativeEndian::read_i16(&bytes[70..72]),
            bitpix: NativeEndian::read_i16(&bytes[72..74]),
            pixdim,
            vox_offset: NativeEndian::read_f32(&bytes[108..112]),
            scl_slope: NativeEndian::read_f32(&bytes[112..116]),
            scl_inter: NativeEndian::read_f32(&bytes[116..120]),
            cal_max: NativeEndian::read_f32(&bytes[124..128]),
            cal_min: NativeEndian::read_f32(&bytes[128..132]),
            qform_code: NativeEndian::read_i16(&bytes[252..254]),
            sform_code: NativeEndian::read_i16(&bytes[254..256]),
            quatern,
            qoffset,
            srow_x,
            srow_y,
            srow_z,
            magic,
        })
    }

    /// Serialize to a native endian header. Fields not modelled here are zero.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; HEADER_SIZE];
        NativeEndian::write_i32(&mut bytes[0..4], HEADER_SIZE as i32);
        NativeEndian::write_i16_into(&self.dim, &mut bytes[40..56]);
        NativeEndian::write_i16(&mut bytes[70..72], self.datatype);
        NativeEndian::write_i16(&mut bytes[72..74], self.bitpix);
        NativeEndian::write_f32_into(&self.pixdim, &mut bytes[76..108]);
        NativeEndian::write_f32(&mut bytes[108..112], self.vox_offset);
        NativeEndian::write_f32(&mut bytes[112..116], self.scl_slope);
        NativeEndian::write_f32(&mut bytes[116..120], self.scl_inter);
        NativeEndian::write_f32(&mut bytes[124..128], self.cal_max);
        NativeEndian::write_f32(&mut bytes[128..132], self.cal_min);
        NativeEndian::write_i16(&mut bytes[252..254], self.qform_code);
        NativeEndian::write_i16(&mut bytes[254..256], self.sform_code);
        NativeEndian::write_f32_into(&self.quatern, &mut bytes[256..268]);
        NativeEndian::write_f32_into(&self.qoffset, &mut bytes[268..280]);
        NativeEndian::write_f32_into(&self.srow_x, &mut bytes[280..296]);
        NativeEndian::write_f32_into(&self.srow_y, &mut bytes[296..312]);
        NativeEndian::write_f32_into(&self.srow_z, &mut bytes[312..328]);
        bytes[344..348].copy_from_slice(&self.magic);
        bytes
    }

    /// Whether the magic string marks this as NIfTI rather than plain Analyze.
    pub fn is_nifti(&self) -> bool {
        self.magic == MAGIC_SINGLE || self.magic == MAGIC_PAIR
    }

    /// Spatial dimensions `[nx, ny, nz]`; missing trailing dimensions are 1.
    pub fn dims(&self) -> Result<[usize; 3], VolumeError> {
        let ndim = self.dim[0];
        if !(1..=7).contains(&ndim) {
            return Err(VolumeError::InvalidHeader(format!(
                "dim[0] is {}, expected 1 to 7",
                ndim
            )));
        }
        let mut dims = [1usize; 3];
        for (axis, size) in dims.iter_mut().enumerate() {
            if axis as i16 + 1 > ndim {
                break;
            }
            let d = self.dim[axis + 1];
            if d < 1 {
                return Err(VolumeError::InvalidHeader(format!(
                    "dim[{}] is {}",
                    axis + 1,
                    d
                )));
            }
            *size = d as usize;
        }
        Ok(dims)
    }

    /// Number of 3D volumes stored (product of dimensions 4 and up).
    pub fn volume_count(&self) -> usize {
        let ndim = self.dim[0].clamp(0, 7) as usize;
        (4..=ndim)
            .map(|i| self.dim[i].max(1) as usize)
            .product::<usize>()
            .max(1)
    }

    /// Slope and intercept with unusable values replaced by the identity.
    pub fn scaling(&self) -> (f32, f32) {
        let slope = if self.scl_slope == 0.0 || !self.scl_slope.is_finite() {
            1.0
        } else {
            self.scl_slope
        };
        let inter = if self.scl_inter.is_finite() {
            self.scl_inter
        } else {
            0.0
        };
        (slope, inter)
    }

    /// Voxel index to world coordinate transform.
    pub fn affine(&self) -> Transform3D {
        if self.is_nifti() && self.sform_code > 0 {
            Transform3D::from_rows(self.srow_x, self.srow_y, self.srow_z)
        } else if self.is_nifti() && self.qform_code > 0 {
            self.qform_affine()
        } else {
            let [dx, dy, dz] = self.voxel_size();
            Transform3D::scaling(voxmesh_core::Vector3::new(dx, dy, dz))
        }
    }

    fn voxel_size(&self) -> [f64; 3] {
        let size = |v: f32| {
            let v = f64::from(v).abs();
            if v > 0.0 && v.is_finite() {
                v
            } else {
                1.0
            }
        };
        [size(self.pixdim[1]), size(self.pixdim[2]), size(self.pixdim[3])]
    }

    fn qform_affine(&self) -> Transform3D {
        let [mut b, mut c, mut d] = self.quatern.map(f64::from);
        let norm = b * b + c * c + d * d;
        let a = if 1.0 - norm < 1e-7 {
            // 180 degree rotation, renormalize the vector part
            let scale = 1.0 / norm.sqrt();
            b *= scale;
            c *= scale;
            d *= scale;
            0.0
        } else {
            (1.0 - norm).sqrt()
        };

        let [dx, dy, mut dz] = self.voxel_size();
        if self.pixdim[0] < 0.0 {
            dz = -dz;
        }
        let [ox, oy, oz] = self.qoffset.map(f64::from);

        let m = Matrix4::new(
            (a * a + b * b - c * c - d * d) * dx,
            2.0 * (b * c - a * d) * dy,
            2.0 * (b * d + a * c) * dz,
            ox,
            2.0 * (b * c + a * d) * dx,
            (a * a + c * c - b * b - d * d) * dy,
            2.0 * (c * d - a * b) * dz,
            oy,
            2.0 * (b * d - a * c) * dx,
            2.0 * (c * d + a * b) * dy,
            (a * a + d * d - c * c - b * b) * dz,
            oz,
            0.0,
            0.0,
            0.0,
            1.0,
        );
        Transform3D::from(m)
    }
}

/// Header and image file locations for `path`. A trailing `.gz` is kept on
/// both names of a pair.
fn resolve_paths(path: &Path) -> (PathBuf, PathBuf) {
    let (base, gz_suffix) = if is_gzip(path) {
        let suffix = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        (path.with_extension(""), suffix)
    } else {
        (path.to_path_buf(), String::new())
    };
    let ext = base
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_string();
    let swap = |to: &str| {
        let swapped = if ext.chars().all(|ch| ch.is_ascii_uppercase()) {
            base.with_extension(to.to_ascii_uppercase())
        } else {
            base.with_extension(to)
        };
        let mut name = OsString::from(swapped);
        name.push(&gz_suffix);
        PathBuf::from(name)
    };
    match ext.to_ascii_lowercase().as_str() {
        "hdr" => (path.to_path_buf(), swap("img")),
        "img" => (swap("hdr"), path.to_path_buf()),
        _ => (path.to_path_buf(), path.to_path_buf()),
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension()
        .map_or(false, |e| e.eq_ignore_ascii_case("gz"))
}

fn open(path: &Path) -> Result<File, VolumeError> {
    File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            VolumeError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            VolumeError::Io(e)
        }
    })
}

/// Buffered reader over `path`, decompressing `.gz` files.
fn open_reader(path: &Path) -> Result<Box<dyn Read>, VolumeError> {
    let file = BufReader::new(open(path)?);
    if is_gzip(path) {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Read the header of a `.nii` or `.hdr` file, compressed or not.
pub fn read_header<P: AsRef<Path>>(path: P) -> Result<NiftiHeader, VolumeError> {
    let (header_path, _) = resolve_paths(path.as_ref());
    let mut bytes = Vec::with_capacity(HEADER_SIZE);
    open_reader(&header_path)?
        .take(HEADER_SIZE as u64)
        .read_to_end(&mut bytes)?;
    NiftiHeader::from_bytes(&bytes)
}

/// Load a NIfTI volume as `f32` intensities.
///
/// Only the first volume of a 4D image is read.
pub fn read_nifti<P: AsRef<Path>>(path: P) -> Result<ScalarVolume, VolumeError> {
    let path = path.as_ref();
    let (header_path, image_path) = resolve_paths(path);
    let header = read_header(&header_path)?;
    let datatype = Datatype::from_code(header.datatype)?;
    let dims = header.dims()?;

    if header.bitpix as usize != datatype.bytes_per_voxel() * 8 {
        warn!(
            bitpix = header.bitpix,
            datatype = header.datatype,
            "bitpix does not match datatype, trusting datatype"
        );
    }
    let volumes = header.volume_count();
    if volumes > 1 {
        warn!(volumes, "reading only the first volume of a 4D image");
    }

    let offset = header.vox_offset;
    if !offset.is_finite() || offset < 0.0 {
        return Err(VolumeError::InvalidHeader(format!(
            "vox_offset {} is invalid",
            offset
        )));
    }
    let offset = offset.round() as u64;
    if header_path == image_path && offset < HEADER_SIZE as u64 {
        return Err(VolumeError::InvalidHeader(format!(
            "vox_offset {} overlaps the header",
            offset
        )));
    }

    let voxels = dims[0] * dims[1] * dims[2];
    let expected = voxels * datatype.bytes_per_voxel();
    let mut reader = open_reader(&image_path)?;
    // gzip streams cannot seek, so the header is read past
    let skipped = std::io::copy(&mut reader.by_ref().take(offset), &mut std::io::sink())?;
    if skipped < offset {
        return Err(VolumeError::Truncated {
            expected: offset as usize + expected,
            actual: skipped as usize,
        });
    }
    let mut raw = Vec::new();
    reader.take(expected as u64).read_to_end(&mut raw)?;
    if raw.len() < expected {
        return Err(VolumeError::Truncated {
            expected,
            actual: raw.len(),
        });
    }

    let mut values = decode(&raw, datatype, voxels);
    let (slope, inter) = header.scaling();
    if slope != 1.0 || inter != 0.0 {
        for v in &mut values {
            *v = *v * slope + inter;
        }
    }

    debug!(
        path = %path.display(),
        nx = dims[0],
        ny = dims[1],
        nz = dims[2],
        datatype = ?datatype,
        "loaded NIfTI volume"
    );

    ScalarVolume::from_vec(dims, values, header.affine())
        .map_err(|e| VolumeError::InvalidHeader(e.to_string()))
}

fn decode(raw: &[u8], datatype: Datatype, voxels: usize) -> Vec<f32> {
    match datatype {
        Datatype::UInt8 => raw.iter().map(|&v| f32::from(v)).collect(),
        Datatype::Int16 => {
            let mut ints = vec![0i16; voxels];
            NativeEndian::read_i16_into(raw, &mut ints);
            ints.into_iter().map(f32::from).collect()
        }
        Datatype::UInt16 => {
            let mut ints = vec![0u16; voxels];
            NativeEndian::read_u16_into(raw, &mut ints);
            ints.into_iter().map(f32::from).collect()
        }
        Datatype::Float32 => {
            let mut floats = vec![0f32; voxels];
            NativeEndian::read_f32_into(raw, &mut floats);
            floats
        }
    }
}

/// Write `volume` as a single-file `f32` NIfTI with its affine as the sform,
/// gzip compressed when `path` ends in `.gz`.
pub fn write_nifti<P: AsRef<Path>>(volume: &ScalarVolume, path: P) -> Result<(), VolumeError> {
    let path = path.as_ref();
    let [nx, ny, nz] = volume.dims();
    let too_large = |d: usize| i16::try_from(d).is_err();
    if too_large(nx) || too_large(ny) || too_large(nz) {
        return Err(VolumeError::InvalidHeader(format!(
            "volume {}x{}x{} exceeds NIfTI-1 dimension limits",
            nx, ny, nz
        )));
    }

    let m = volume.affine.matrix;
    let row = |r: usize| [m[(r, 0)], m[(r, 1)], m[(r, 2)], m[(r, 3)]].map(|v| v as f32);
    let column_norm = |c: usize| {
        (m[(0, c)] * m[(0, c)] + m[(1, c)] * m[(1, c)] + m[(2, c)] * m[(2, c)]).sqrt() as f32
    };
    let (min, max) = volume.value_range().unwrap_or((0.0, 0.0));

    let header = NiftiHeader {
        dim: [3, nx as i16, ny as i16, nz as i16, 1, 1, 1, 1],
        pixdim: [1.0, column_norm(0), column_norm(1), column_norm(2), 1.0, 1.0, 1.0, 1.0],
        cal_min: min,
        cal_max: max,
        sform_code: 1,
        srow_x: row(0),
        srow_y: row(1),
        srow_z: row(2),
        ..Default::default()
    };

    let values = volume.to_vec();
    let mut raw = vec![0u8; values.len() * 4];
    NativeEndian::write_f32_into(&values, &mut raw);

    let writer = BufWriter::new(File::create(path)?);
    if is_gzip(path) {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        write_single_file(&mut encoder, &header, &raw)?;
        encoder.finish()?.flush()?;
    } else {
        let mut writer = writer;
        write_single_file(&mut writer, &header, &raw)?;
        writer.flush()?;
    }
    Ok(())
}

fn write_single_file<W: Write>(
    writer: &mut W,
    header: &NiftiHeader,
    raw: &[u8],
) -> Result<(), VolumeError> {
    writer.write_all(&header.to_bytes())?;
    writer.write_all(&[0u8; SINGLE_FILE_OFFSET - HEADER_SIZE])?;
    writer.write_all(raw)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::tempdir;
    use voxmesh_core::Point3f;

    fn write_raw(path: &Path, header: &NiftiHeader, data: &[u8]) {
        let mut bytes = header.to_bytes();
        let offset = header.vox_offset as usize;
        if offset > bytes.len() {
            bytes.resize(offset, 0);
        }
        bytes.extend_from_slice(data);
        std::fs::write(path, bytes).unwrap();
    }

    fn int16_header(dims: [i16; 3]) -> NiftiHeader {
        NiftiHeader {
            dim: [3, dims[0], dims[1], dims[2], 1, 1, 1, 1],
            datatype: Datatype::Int16.code(),
            bitpix: 16,
            ..Default::default()
        }
    }

    #[test]
    fn test_header_bytes_roundtrip() {
        let header = NiftiHeader {
            dim: [3, 4, 5, 6, 1, 1, 1, 1],
            scl_slope: 2.0,
            sform_code: 2,
            srow_x: [2.0, 0.0, 0.0, -10.0],
            ..Default::default()
        };
        let parsed = NiftiHeader::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_write_read_float_volume() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob.nii");
        let affine = Transform3D::from_rows(
            [2.0, 0.0, 0.0, -3.0],
            [0.0, 2.0, 0.0, 4.0],
            [0.0, 0.0, 3.0, 5.0],
        );
        let volume =
            ScalarVolume::from_fn([4, 3, 2], |x, y, z| (x + 10 * y + 100 * z) as f32)
                .with_affine(affine);

        write_nifti(&volume, &path).unwrap();
        let loaded = read_nifti(&path).unwrap();

        assert_eq!(loaded.dims(), [4, 3, 2]);
        assert_eq!(loaded.get(3, 2, 1), 123.0);
        assert_eq!(loaded.to_vec(), volume.to_vec());
        let p = loaded.affine.transform_point(&Point3f::new(1.0, 1.0, 1.0));
        assert_relative_eq!(p.x, -1.0);
        assert_relative_eq!(p.y, 6.0);
        assert_relative_eq!(p.z, 8.0);
    }

    #[test]
    fn test_gzip_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob.nii.gz");
        let volume = ScalarVolume::from_fn([5, 4, 3], |x, y, z| (x * y + z) as f32 - 2.5)
            .with_affine(Transform3D::from_rows(
                [-1.5, 0.0, 0.0, 90.0],
                [0.0, 1.5, 0.0, -126.0],
                [0.0, 0.0, 1.5, -72.0],
            ));

        write_nifti(&volume, &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);

        let header = read_header(&path).unwrap();
        assert_eq!(header.dims().unwrap(), [5, 4, 3]);
        let loaded = read_nifti(&path).unwrap();
        assert_eq!(loaded, volume);
    }

    #[test]
    fn test_gzip_header_image_pair() {
        let dir = tempdir().unwrap();
        let header = NiftiHeader {
            dim: [3, 3, 1, 1, 1, 1, 1, 1],
            datatype: Datatype::UInt8.code(),
            bitpix: 8,
            vox_offset: 0.0,
            magic: MAGIC_PAIR,
            ..Default::default()
        };
        let gzip = |path: PathBuf, data: &[u8]| {
            let mut encoder = GzEncoder::new(File::create(path).unwrap(), Compression::fast());
            encoder.write_all(data).unwrap();
            encoder.finish().unwrap();
        };
        gzip(dir.path().join("pair.hdr.gz"), &header.to_bytes());
        gzip(dir.path().join("pair.img.gz"), &[4, 5, 6]);

        let from_hdr = read_nifti(dir.path().join("pair.hdr.gz")).unwrap();
        let from_img = read_nifti(dir.path().join("pair.img.gz")).unwrap();
        assert_eq!(from_hdr.to_vec(), vec![4.0, 5.0, 6.0]);
        assert_eq!(from_hdr, from_img);
    }

    #[test]
    fn test_resolve_paths() {
        assert_eq!(
            resolve_paths(Path::new("t1.nii.gz")),
            (PathBuf::from("t1.nii.gz"), PathBuf::from("t1.nii.gz"))
        );
        assert_eq!(
            resolve_paths(Path::new("a/scan.hdr.gz")),
            (PathBuf::from("a/scan.hdr.gz"), PathBuf::from("a/scan.img.gz"))
        );
        assert_eq!(
            resolve_paths(Path::new("SCAN.IMG.GZ")),
            (PathBuf::from("SCAN.HDR.GZ"), PathBuf::from("SCAN.IMG.GZ"))
        );
        assert_eq!(
            resolve_paths(Path::new("scan.img")),
            (PathBuf::from("scan.hdr"), PathBuf::from("scan.img"))
        );
    }

    #[test]
    fn test_int16_with_scaling() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scaled.nii");
        let mut header = int16_header([2, 2, 1]);
        header.scl_slope = 0.5;
        header.scl_inter = 10.0;
        let mut data = vec![0u8; 8];
        NativeEndian::write_i16_into(&[-4, 0, 2, 100], &mut data);
        write_raw(&path, &header, &data);

        let volume = read_nifti(&path).unwrap();
        assert_eq!(volume.to_vec(), vec![8.0, 10.0, 11.0, 60.0]);
    }

    #[test]
    fn test_zero_slope_means_unscaled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("raw.nii");
        let header = NiftiHeader {
            dim: [3, 3, 1, 1, 1, 1, 1, 1],
            datatype: Datatype::UInt8.code(),
            bitpix: 8,
            scl_slope: 0.0,
            ..Default::default()
        };
        write_raw(&path, &header, &[0, 7, 255]);
        assert_eq!(read_nifti(&path).unwrap().to_vec(), vec![0.0, 7.0, 255.0]);
    }

    #[test]
    fn test_header_image_pair() {
        let dir = tempdir().unwrap();
        let header = NiftiHeader {
            dim: [3, 2, 1, 1, 1, 1, 1, 1],
            datatype: Datatype::UInt16.code(),
            bitpix: 16,
            vox_offset: 0.0,
            magic: MAGIC_PAIR,
            ..Default::default()
        };
        std::fs::write(dir.path().join("pair.hdr"), header.to_bytes()).unwrap();
        let mut data = vec![0u8; 4];
        NativeEndian::write_u16_into(&[1, 65535], &mut data);
        std::fs::write(dir.path().join("pair.img"), data).unwrap();

        let from_hdr = read_nifti(dir.path().join("pair.hdr")).unwrap();
        let from_img = read_nifti(dir.path().join("pair.img")).unwrap();
        assert_eq!(from_hdr.to_vec(), vec![1.0, 65535.0]);
        assert_eq!(from_hdr, from_img);
    }

    #[test]
    fn test_first_volume_of_4d() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("series.nii");
        let header = NiftiHeader {
            dim: [4, 2, 1, 1, 3, 1, 1, 1],
            datatype: Datatype::UInt8.code(),
            bitpix: 8,
            ..Default::default()
        };
        write_raw(&path, &header, &[1, 2, 3, 4, 5, 6]);
        let volume = read_nifti(&path).unwrap();
        assert_eq!(volume.to_vec(), vec![1.0, 2.0]);
        assert_eq!(header.volume_count(), 3);
    }

    #[test]
    fn test_affine_fallbacks() {
        let mut header = NiftiHeader {
            pixdim: [1.0, 2.0, 3.0, 4.0, 1.0, 1.0, 1.0, 1.0],
            ..Default::default()
        };
        let p = header.affine().transform_point(&Point3f::new(1.0, 1.0, 1.0));
        assert_relative_eq!(p.x, 2.0);
        assert_relative_eq!(p.y, 3.0);
        assert_relative_eq!(p.z, 4.0);

        // Identity rotation quaternion with an offset and flipped z
        header.qform_code = 1;
        header.qoffset = [10.0, 20.0, 30.0];
        header.pixdim[0] = -1.0;
        let p = header.affine().transform_point(&Point3f::new(1.0, 1.0, 1.0));
        assert_relative_eq!(p.x, 12.0);
        assert_relative_eq!(p.y, 23.0);
        assert_relative_eq!(p.z, 26.0);

        // 180 degrees about z
        header.quatern = [0.0, 0.0, 1.0];
        header.pixdim[0] = 1.0;
        let p = header.affine().transform_point(&Point3f::new(1.0, 1.0, 1.0));
        assert_relative_eq!(p.x, 8.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 17.0, epsilon = 1e-5);
        assert_relative_eq!(p.z, 34.0, epsilon = 1e-5);
    }

    #[test]
    fn test_rejects_foreign_endian() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("swapped.nii");
        let mut bytes = NiftiHeader::default().to_bytes();
        bytes[0..4].copy_from_slice(&(HEADER_SIZE as i32).swap_bytes().to_ne_bytes());
        std::fs::write(&path, bytes).unwrap();
        assert!(matches!(read_nifti(&path), Err(VolumeError::ForeignEndian)));
    }

    #[test]
    fn test_rejects_bad_files() {
        let dir = tempdir().unwrap();

        let missing = dir.path().join("missing.nii");
        assert!(matches!(
            read_nifti(&missing),
            Err(VolumeError::FileNotFound { path }) if path == missing
        ));

        let corrupt = dir.path().join("corrupt.nii.gz");
        std::fs::write(&corrupt, b"not a gzip stream").unwrap();
        assert!(read_nifti(&corrupt).is_err());

        let short = dir.path().join("short.nii");
        std::fs::write(&short, [0u8; 100]).unwrap();
        assert!(matches!(
            read_nifti(&short),
            Err(VolumeError::InvalidHeader(_))
        ));

        let complex = dir.path().join("complex.nii");
        let header = NiftiHeader {
            datatype: 32,
            bitpix: 64,
            ..Default::default()
        };
        write_raw(&complex, &header, &[0u8; 8]);
        assert!(matches!(
            read_nifti(&complex),
            Err(VolumeError::UnsupportedDatatype { code: 32 })
        ));

        let truncated = dir.path().join("truncated.nii");
        write_raw(&truncated, &int16_header([4, 4, 4]), &[0u8; 10]);
        assert!(matches!(
            read_nifti(&truncated),
            Err(VolumeError::Truncated {
                expected: 128,
                actual: 10
            })
        ));
    }
}
