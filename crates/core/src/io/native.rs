//! Native GeoTIFF reading/writing built on the `tiff` crate
//!
//! Multi-band images are stored as one IFD per band, in band order. Each IFD
//! carries the band name in `ImageDescription`, the georeferencing tags
//! (pixel scale, tiepoint, GeoKey directory) and the `GDAL_NODATA` marker.
//! Samples are written as 32-bit floats.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{BandStack, GeoTransform, Raster, RasterElement};

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

fn tiff_err(context: &str) -> impl Fn(tiff::TiffError) -> Error + '_ {
    move |e| Error::Tiff(format!("{}: {}", context, e))
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read the first band of a GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = BufReader::new(File::open(path.as_ref())?);
    first_band(decode_bands(file)?)
}

/// Read the first band of an in-memory GeoTIFF
pub fn read_geotiff_from_buffer<T: RasterElement>(data: &[u8]) -> Result<Raster<T>> {
    first_band(decode_bands(Cursor::new(data))?)
}

/// Read every band of a GeoTIFF file, restoring band names, transform and no-data
pub fn read_geotiff_bands<P: AsRef<Path>>(path: P) -> Result<BandStack> {
    let file = BufReader::new(File::open(path.as_ref())?);
    decode_bands(file)
}

fn first_band<T: RasterElement>(stack: BandStack) -> Result<Raster<T>> {
    let band = stack
        .into_bands()
        .into_iter()
        .next()
        .ok_or_else(|| Error::Tiff("file contains no image".into()))?;

    let src = band.raster;
    let nodata = src.nodata().map(T::from_f64_or_nodata);
    let data: Vec<T> = src.data().iter().map(|&v| T::from_f64_or_nodata(v)).collect();
    src.derive(data, nodata)
}

fn decode_bands<R: Read + Seek>(reader: R) -> Result<BandStack> {
    let mut decoder = Decoder::new(reader).map_err(tiff_err("TIFF decode error"))?;
    let mut stack = BandStack::new();
    let mut index = 0usize;

    loop {
        index += 1;
        let mut raster = decode_current(&mut decoder)?;

        if let Ok(transform) = read_geotransform(&mut decoder) {
            raster.set_transform(transform);
        }
        raster.set_crs(read_crs(&mut decoder));
        if let Ok(text) = decoder.get_tag_ascii_string(tag(GDAL_NODATA)) {
            raster.set_nodata(text.trim().trim_end_matches('\0').parse::<f64>().ok());
        }

        let name = decoder
            .get_tag_ascii_string(Tag::ImageDescription)
            .map(|s| s.trim_end_matches('\0').to_string())
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("band_{}", index));
        stack.push(name, raster)?;

        if !decoder.more_images() {
            break;
        }
        decoder.next_image().map_err(tiff_err("Cannot advance to next band"))?;
    }

    Ok(stack)
}

fn decode_current<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Raster<f64>> {
    let (width, height) = decoder
        .dimensions()
        .map_err(tiff_err("Cannot read dimensions"))?;
    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(tiff_err("Cannot read image data"))?;

    let data: Vec<f64> = match result {
        DecodingResult::F32(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::F64(buf) => buf,
        DecodingResult::U8(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::U16(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::U32(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::I8(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::I16(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::I32(buf) => buf.iter().map(|&v| v as f64).collect(),
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".into())),
    };

    // Multi-sample (RGB etc.) pages are not band-per-IFD images.
    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    Raster::from_vec(data, rows, cols)
}

/// Read GeoTransform from ModelPixelScale + ModelTiepoint
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(tag(MODEL_PIXEL_SCALE))
        .map_err(tiff_err("No pixel scale tag"))?;
    let tiepoint = decoder
        .get_tag_f64_vec(tag(MODEL_TIEPOINT))
        .map_err(tiff_err("No tiepoint tag"))?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(Error::Tiff("Cannot determine geotransform".into()));
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder.get_tag_u16_vec(tag(GEO_KEY_DIRECTORY)).ok()?;
    keys.get(4..)?
        .chunks_exact(4)
        .find(|entry| {
            (entry[0] == GEOGRAPHIC_TYPE_KEY || entry[0] == PROJECTED_CS_TYPE_KEY)
                && entry[1] == 0
        })
        .map(|entry| CRS::from_epsg(entry[3] as u32))
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Write a single raster to a GeoTIFF file (non-atomic; see `export` for the
/// durable variant).
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let stack = BandStack::from_bands([("band_1", raster.to_f64())])?;
    let file = File::create(path.as_ref())?;
    encode_bands(&stack, file)
}

/// Write a single raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T: RasterElement>(raster: &Raster<T>) -> Result<Vec<u8>> {
    let stack = BandStack::from_bands([("band_1", raster.to_f64())])?;
    let mut buf = Vec::new();
    encode_bands(&stack, Cursor::new(&mut buf))?;
    Ok(buf)
}

/// Encode every band of `stack` as one IFD each into any `Write + Seek` sink
pub fn encode_bands<W: Write + Seek>(stack: &BandStack, writer: W) -> Result<()> {
    if stack.is_empty() {
        return Err(Error::InvalidParameter {
            name: "stack",
            value: "0 bands".into(),
            reason: "at least one band is required".into(),
        });
    }

    let mut encoder = TiffEncoder::new(writer).map_err(tiff_err("TIFF encoder error"))?;
    let (rows, cols) = stack.shape();

    for band in stack.bands() {
        let raster = &band.raster;
        let data: Vec<f32> = raster.data().iter().map(|&v| v as f32).collect();

        let mut image = encoder
            .new_image::<Gray32Float>(cols as u32, rows as u32)
            .map_err(tiff_err("Cannot create TIFF image"))?;

        let gt = raster.transform();
        let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
        let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
        let geokeys = geokey_directory(raster.crs());
        let nodata = match raster.nodata() {
            Some(v) if !v.is_nan() => format!("{}", v),
            _ => "nan".to_string(),
        };

        let enc = image.encoder();
        enc.write_tag(Tag::ImageDescription, band.name.as_str())
            .map_err(tiff_err("Cannot write band name"))?;
        enc.write_tag(tag(MODEL_PIXEL_SCALE), &scale[..])
            .map_err(tiff_err("Cannot write scale tag"))?;
        enc.write_tag(tag(MODEL_TIEPOINT), &tiepoint[..])
            .map_err(tiff_err("Cannot write tiepoint tag"))?;
        enc.write_tag(tag(GEO_KEY_DIRECTORY), geokeys.as_slice())
            .map_err(tiff_err("Cannot write geokey tag"))?;
        enc.write_tag(tag(GDAL_NODATA), nodata.as_str())
            .map_err(tiff_err("Cannot write nodata tag"))?;

        image
            .write_data(&data)
            .map_err(tiff_err("Cannot write image data"))?;
    }

    Ok(())
}

/// Minimal GeoKey directory: model type, raster type and, when the EPSG code
/// is known, the geographic or projected CS type.
fn geokey_directory(crs: Option<&CRS>) -> Vec<u16> {
    let geographic = crs.map_or(false, CRS::is_geographic);
    let epsg = crs
        .and_then(CRS::epsg)
        .and_then(|code| u16::try_from(code).ok());

    let mut entries: Vec<[u16; 4]> = vec![
        [GT_MODEL_TYPE_KEY, 0, 1, if geographic { 2 } else { 1 }],
        [GT_RASTER_TYPE_KEY, 0, 1, 1], // RasterPixelIsArea
    ];
    if let Some(code) = epsg {
        let key = if geographic { GEOGRAPHIC_TYPE_KEY } else { PROJECTED_CS_TYPE_KEY };
        entries.push([key, 0, 1, code]);
    }

    let mut keys = vec![1, 1, 0, entries.len() as u16];
    keys.extend(entries.iter().flatten());
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_raster() -> Raster<f64> {
        let mut r = Raster::from_vec(vec![0.1, 0.2, f64::NAN, 0.4, 0.5, 0.6], 2, 3).unwrap();
        r.set_transform(GeoTransform::new(500_000.0, 3_400_000.0, 10.0, -10.0));
        r.set_crs(Some(CRS::utm(43, true)));
        r
    }

    #[test]
    fn single_band_buffer_roundtrip() {
        let raster = sample_raster();
        let buf = write_geotiff_to_buffer(&raster).unwrap();
        let back: Raster<f64> = read_geotiff_from_buffer(&buf).unwrap();

        assert_eq!(back.shape(), (2, 3));
        assert_eq!(back.transform(), raster.transform());
        assert_eq!(back.crs(), Some(&CRS::utm(43, true)));
        assert!(back.get(1, 0).unwrap().is_nan());
        assert!((back.get(1, 2).unwrap() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn multi_band_names_and_markers_survive() {
        let mut labels: Raster<i32> = Raster::from_vec(vec![0, 1, -1, 2, 3, 3], 2, 3).unwrap();
        labels.set_nodata(Some(-1));
        labels.set_transform(*sample_raster().transform());

        let stack = BandStack::from_bands([
            ("ndvi", sample_raster()),
            ("cluster", labels.to_f64()),
        ])
        .unwrap();

        let mut buf = Vec::new();
        encode_bands(&stack, Cursor::new(&mut buf)).unwrap();
        let back = decode_bands(Cursor::new(&buf)).unwrap();

        assert_eq!(back.names(), vec!["ndvi", "cluster"]);
        let cluster = back.band("cluster").unwrap();
        assert_eq!(cluster.nodata(), Some(-1.0));
        assert!(cluster.is_nodata(cluster.get(0, 2).unwrap()));
        assert_eq!(cluster.get(1, 0).unwrap(), 2.0);
    }

    #[test]
    fn empty_stack_is_rejected() {
        let mut buf = Vec::new();
        assert!(encode_bands(&BandStack::new(), Cursor::new(&mut buf)).is_err());
    }
}
