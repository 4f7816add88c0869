use futures::future::{BoxFuture, FutureExt};
use image::{ImageFormat, ImageReader};
use log::debug;
use std::io::Cursor;

use super::{RasterArtifact, RasterContext, RasterStrategy};
use crate::capture::PrescriptionPayload;
use crate::data_uri;
use crate::error::RasterError;

/// Decodes an already-rasterized drawing
#[derive(Debug, Default, Clone, Copy)]
pub struct BitmapDecode;

impl BitmapDecode {
    fn decode(data_uri: &str, ctx: &RasterContext<'_>) -> Result<RasterArtifact, RasterError> {
        let decoded = data_uri::decode(data_uri)?;
        let reader = ImageReader::new(Cursor::new(&decoded.bytes))
            .with_guessed_format()
            .map_err(|e| RasterError::InvalidImageData(e.to_string()))?;
        let format = reader.format();
        let image = reader
            .decode()
            .map_err(|e| RasterError::InvalidImageData(e.to_string()))?;
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidImageData("image has no area".into()));
        }

        let png = if format == Some(ImageFormat::Png) {
            decoded.bytes
        } else {
            debug!("Re-encoding {} as PNG", decoded.content_type);
            let mut out = Cursor::new(Vec::new());
            image
                .write_to(&mut out, ImageFormat::Png)
                .map_err(|e| RasterError::Encode(e.to_string()))?;
            out.into_inner()
        };

        Ok(RasterArtifact::from_png(png, width, height, ctx))
    }
}

impl RasterStrategy for BitmapDecode {
    fn name(&self) -> &'static str {
        "bitmap-decode"
    }

    fn rasterize<'a>(
        &'a self,
        payload: &'a PrescriptionPayload,
        ctx: &'a RasterContext<'a>,
    ) -> BoxFuture<'a, Result<RasterArtifact, RasterError>> {
        async move {
            match payload {
                PrescriptionPayload::Drawing {
                    data_uri: Some(uri),
                } => Self::decode(uri, ctx),
                PrescriptionPayload::Drawing { data_uri: None } => Err(
                    RasterError::InvalidImageData("drawing payload has no image".into()),
                ),
                other => Err(RasterError::UnsupportedPayload {
                    strategy: self.name(),
                    kind: other.kind(),
                }),
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{ObjectUrlRegistry, RasterOptions};
    use futures::executor::block_on;

    fn png_uri(width: u32, height: u32) -> String {
        let mut pixmap = tiny_skia::Pixmap::new(width, height).unwrap();
        pixmap.fill(tiny_skia::Color::BLACK);
        data_uri::encode_png(&pixmap.encode_png().unwrap())
    }

    #[test]
    fn test_decodes_png_dimensions() {
        let options = RasterOptions::default();
        let urls = ObjectUrlRegistry::new();
        let ctx = RasterContext {
            subject: "Ann",
            options: &options,
            object_urls: &urls,
        };
        let payload = PrescriptionPayload::Drawing {
            data_uri: Some(png_uri(30, 12)),
        };
        let artifact = block_on(BitmapDecode.rasterize(&payload, &ctx)).unwrap();
        assert_eq!((artifact.width(), artifact.height()), (30, 12));
        assert_eq!(artifact.content_type(), "image/png");
        assert_eq!(urls.live_count(), 1);
    }

    #[test]
    fn test_garbage_is_invalid_image_data() {
        let options = RasterOptions::default();
        let urls = ObjectUrlRegistry::new();
        let ctx = RasterContext {
            subject: "Ann",
            options: &options,
            object_urls: &urls,
        };
        let payload = PrescriptionPayload::Drawing {
            data_uri: Some("data:image/png;base64,bm90IGEgcG5n".into()),
        };
        let err = block_on(BitmapDecode.rasterize(&payload, &ctx)).unwrap_err();
        assert!(matches!(err, RasterError::InvalidImageData(_)));
        assert_eq!(urls.live_count(), 0);
    }

    #[test]
    fn test_rejects_text_payload() {
        let options = RasterOptions::default();
        let urls = ObjectUrlRegistry::new();
        let ctx = RasterContext {
            subject: "Ann",
            options: &options,
            object_urls: &urls,
        };
        let payload = PrescriptionPayload::Text {
            html: "<p>x</p>".into(),
            plain: "x".into(),
        };
        assert!(matches!(
            block_on(BitmapDecode.rasterize(&payload, &ctx)),
            Err(RasterError::UnsupportedPayload { .. })
        ));
    }
}
