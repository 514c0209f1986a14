// This code is inspired by https://github.com/fschutt/printpdf/blob/2bebdc65d06dafbe926ed4b43fedd10f966c59d3/src/xobject.rs

use crate::Error;
use lopdf::ObjectId;
use png::{BitDepth, ColorType, Transformations};
use std::io::Read;

#[derive(Debug, Clone)]
pub struct ImageXObject {
    /// Width of the image (original width, not scaled width)
    pub width: u32,
    /// Height of the image (original height, not scaled height)
    pub height: u32,
    /// Color space (Greyscale, RGB)
    pub color_space: ColorType,
    /// Bits per color component. Always 8 after decoding, palettes and low bit depths
    /// are expanded and 16 bit channels stripped.
    pub bits_per_component: BitDepth,
    /// Should the image be interpolated when scaled?
    pub interpolate: bool,
    /// The actual data from the image
    pub image_data: Vec<u8>,
    /// Image used as a soft mask. (transparency)
    pub s_mask: Option<ObjectId>,
}

impl ImageXObject {
    /// Returns 1 or 2 images. The first is the color images.
    /// The second is (if present) the mask/alpha channel of the image.
    pub fn try_from<R: Read>(
        mut image_decoder: png::Decoder<R>,
    ) -> Result<(Self, Option<Self>), Error> {
        image_decoder.set_transformations(Transformations::EXPAND | Transformations::STRIP_16);
        let mut image_reader = image_decoder.read_info()?;
        // Allocate the output buffer.
        let mut buf = vec![0; image_reader.output_buffer_size()];
        // Only the first frame of an APNG is used.
        let info = image_reader.next_frame(&mut buf)?;
        let image_data = &buf[..info.buffer_size()];

        if info.bit_depth != BitDepth::Eight {
            return Err(Error::Validation(format!(
                "unsupported PNG bit depth after expansion: {:?}",
                info.bit_depth
            )));
        }

        let (color_space, image_color_data, alpha_data) = match info.color_type {
            ColorType::Rgba => {
                let (color, alpha) = Self::split_alpha(image_data, 3);
                (ColorType::Rgb, color, Some(alpha))
            }
            ColorType::GrayscaleAlpha => {
                let (color, alpha) = Self::split_alpha(image_data, 1);
                (ColorType::Grayscale, color, Some(alpha))
            }
            ColorType::Rgb | ColorType::Grayscale => (info.color_type, image_data.to_vec(), None),
            ColorType::Indexed => {
                return Err(Error::Validation(
                    "indexed PNG was not expanded to RGB".to_owned(),
                ))
            }
        };

        Ok((
            Self {
                width: info.width,
                height: info.height,
                color_space,
                bits_per_component: info.bit_depth,
                image_data: image_color_data,
                interpolate: false,
                s_mask: None, // This should be filled in later
            },
            alpha_data.map(|alpha_data| Self {
                width: info.width,
                height: info.height,
                color_space: ColorType::Grayscale,
                bits_per_component: info.bit_depth,
                image_data: alpha_data,
                interpolate: false,
                s_mask: None,
            }),
        ))
    }

    // NOTE: This function only works for a bit depth of 8.
    /// Split interleaved pixels of `color_channels` color bytes followed by one alpha byte.
    fn split_alpha(data: &[u8], color_channels: usize) -> (Vec<u8>, Vec<u8>) {
        let pixel_size = color_channels + 1;
        let pixels = data.len() / pixel_size;
        let mut color = Vec::with_capacity(pixels * color_channels);
        let mut alpha = Vec::with_capacity(pixels);
        for pixel in data.chunks_exact(pixel_size) {
            color.extend_from_slice(&pixel[..color_channels]);
            alpha.push(pixel[color_channels]);
        }
        (color, alpha)
    }
}

// Inspired and derived from: https://github.com/fschutt/printpdf/blob/2bebdc65d06dafbe926ed4b43fedd10f966c59d3/src/xobject.rs#L245
impl From<ImageXObject> for lopdf::Stream {
    fn from(image: ImageXObject) -> Self {
        use lopdf::Object::*;

        let cs: &'static str = match image.color_space {
            ColorType::Rgb => "DeviceRGB",
            ColorType::Grayscale => "DeviceGray",
            ColorType::Indexed => "Indexed",
            ColorType::Rgba | ColorType::GrayscaleAlpha => "DeviceN",
        };

        let mut dict = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("XObject".as_bytes().to_vec())),
            ("Subtype", Name("Image".as_bytes().to_vec())),
            ("Width", Integer(image.width as i64)),
            ("Height", Integer(image.height as i64)),
            ("Interpolate", image.interpolate.into()),
            ("BitsPerComponent", Integer(image.bits_per_component as i64)),
            ("ColorSpace", Name(cs.as_bytes().to_vec())),
        ]);
        if let Some(s_mask) = image.s_mask {
            dict.set("SMask", Reference(s_mask));
        }

        lopdf::Stream::new(dict, image.image_data)
    }
}

impl From<ImageXObject> for lopdf::Object {
    fn from(image: ImageXObject) -> Self {
        lopdf::Object::Stream(image.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_png(width: u32, height: u32, color: ColorType, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(color);
            encoder.set_depth(BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(data).unwrap();
        }
        out
    }

    #[test]
    fn rgba_image_is_split_into_color_and_mask() {
        // 2x1: opaque red, half transparent blue
        let png = encode_png(2, 1, ColorType::Rgba, &[255, 0, 0, 255, 0, 0, 255, 128]);
        let (image, mask) = ImageXObject::try_from(png::Decoder::new(&png[..])).unwrap();

        assert_eq!(image.color_space, ColorType::Rgb);
        assert_eq!(image.image_data, vec![255, 0, 0, 0, 0, 255]);
        let mask = mask.expect("rgba image has an alpha mask");
        assert_eq!(mask.color_space, ColorType::Grayscale);
        assert_eq!(mask.image_data, vec![255, 128]);
    }

    #[test]
    fn grayscale_alpha_mask_holds_alpha_not_gray() {
        let png = encode_png(2, 1, ColorType::GrayscaleAlpha, &[10, 200, 20, 0]);
        let (image, mask) = ImageXObject::try_from(png::Decoder::new(&png[..])).unwrap();

        assert_eq!(image.image_data, vec![10, 20]);
        assert_eq!(mask.unwrap().image_data, vec![200, 0]);
    }

    #[test]
    fn rgb_image_has_no_mask() {
        let png = encode_png(1, 1, ColorType::Rgb, &[1, 2, 3]);
        let (image, mask) = ImageXObject::try_from(png::Decoder::new(&png[..])).unwrap();

        assert_eq!((image.width, image.height), (1, 1));
        assert!(mask.is_none());
    }

    #[test]
    fn garbage_is_a_png_error() {
        let result = ImageXObject::try_from(png::Decoder::new(&b"not a png"[..]));
        assert!(matches!(result, Err(Error::Png(_))));
    }

    #[test]
    fn stream_dictionary_references_mask() {
        let png = encode_png(1, 1, ColorType::Rgb, &[1, 2, 3]);
        let (mut image, _) = ImageXObject::try_from(png::Decoder::new(&png[..])).unwrap();
        image.s_mask = Some((7, 0));
        let stream: lopdf::Stream = image.into();

        assert_eq!(stream.dict.get(b"SMask").unwrap().as_reference().unwrap(), (7, 0));
        assert_eq!(stream.dict.get(b"ColorSpace").unwrap().as_name_str().unwrap(), "DeviceRGB");
    }
}
