//! Carousel slide rendering and ZIP packaging.
//!
//! Slides are laid out as draw operations (`layout`), painted onto a
//! gradient canvas, encoded as PNG, and bundled into a ZIP whose entries are
//! named `slide_{number}.png`.

pub mod error;
pub mod layout;
pub mod theme;
pub mod wrap;

pub use error::{RenderError, Result};
pub use theme::Palette;
pub use wrap::wrap_text;

use std::io::{Cursor, Write};
use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::{debug, warn};
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use content_factory_common::file_config::RendererConfig;
use content_factory_common::{PlanStructure, Slide, Theme};

use layout::{layout_slide, DrawOp, Ink, Weight, HEIGHT, WIDTH};

/// A rendered carousel ready for upload.
#[derive(Debug, Clone)]
pub struct CarouselBundle {
    pub bundle_id: Uuid,
    pub zip: Vec<u8>,
    /// PNG of the first slide.
    pub thumbnail: Vec<u8>,
    pub slide_count: usize,
}

#[derive(Clone, Default)]
struct Fonts {
    bold: Option<FontArc>,
    regular: Option<FontArc>,
}

impl Fonts {
    fn get(&self, weight: Weight) -> Option<&FontArc> {
        match weight {
            Weight::Bold => self.bold.as_ref(),
            Weight::Regular => self.regular.as_ref(),
        }
    }
}

fn load_font(path: &Path) -> Option<FontArc> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Font not readable, text in this weight will be skipped");
            return None;
        }
    };
    match FontArc::try_from_vec(bytes) {
        Ok(font) => Some(font),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Font not parseable, text in this weight will be skipped");
            None
        }
    }
}

#[derive(Clone)]
pub struct CarouselRenderer {
    palette: Palette,
    fonts: Fonts,
    footer: String,
}

impl CarouselRenderer {
    /// Build a renderer from config. Missing fonts are logged, not fatal.
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            palette: Palette::for_theme(config.theme()),
            fonts: Fonts {
                bold: load_font(&config.font_bold),
                regular: load_font(&config.font_regular),
            },
            footer: config.footer.clone(),
        }
    }

    /// Renderer that draws shapes only.
    pub fn without_fonts(theme: Theme, footer: impl Into<String>) -> Self {
        Self {
            palette: Palette::for_theme(theme),
            fonts: Fonts::default(),
            footer: footer.into(),
        }
    }

    pub fn with_fonts(mut self, bold: FontArc, regular: FontArc) -> Self {
        self.fonts = Fonts {
            bold: Some(bold),
            regular: Some(regular),
        };
        self
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    fn ink(&self, ink: Ink) -> Rgb<u8> {
        match ink {
            Ink::Text => self.palette.text,
            Ink::Accent => self.palette.accent,
            Ink::Muted => self.palette.muted,
        }
    }

    pub fn render_slide(&self, slide: &Slide) -> RgbImage {
        let mut img = RgbImage::from_fn(WIDTH, HEIGHT, |_, y| self.palette.gradient_at(y, HEIGHT));

        for op in layout_slide(slide, &self.footer) {
            match op {
                DrawOp::Rect { x0, y0, x1, y1, ink } => {
                    let w = (x1 - x0 + 1).max(1) as u32;
                    let h = (y1 - y0 + 1).max(1) as u32;
                    draw_filled_rect_mut(&mut img, Rect::at(x0, y0).of_size(w, h), self.ink(ink));
                }
                DrawOp::Text {
                    x,
                    y,
                    size,
                    weight,
                    ink,
                    text,
                } => match self.fonts.get(weight) {
                    Some(font) => {
                        draw_text_mut(&mut img, self.ink(ink), x, y, PxScale::from(size), font, &text);
                    }
                    None => debug!(text = %text, "Skipping text, font unavailable"),
                },
            }
        }

        img
    }

    pub fn render_png(&self, slide: &Slide) -> Result<Vec<u8>> {
        let img = self.render_slide(slide);
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png)?;
        Ok(buf.into_inner())
    }

    /// Render every slide and bundle them into a ZIP.
    pub fn package(&self, plan: &PlanStructure) -> Result<CarouselBundle> {
        if plan.slides.is_empty() {
            return Err(RenderError::NoSlides);
        }

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let mut thumbnail = None;

        for slide in &plan.slides {
            let png = self.render_png(slide)?;
            zip.start_file(format!("slide_{}.png", slide.number), options)?;
            zip.write_all(&png)?;
            if thumbnail.is_none() {
                thumbnail = Some(png);
            }
        }

        let zip = zip.finish()?.into_inner();
        let bundle = CarouselBundle {
            bundle_id: Uuid::new_v4(),
            zip,
            thumbnail: thumbnail.unwrap_or_default(),
            slide_count: plan.slides.len(),
        };
        debug!(
            bundle_id = %bundle.bundle_id,
            slides = bundle.slide_count,
            bytes = bundle.zip.len(),
            "Carousel packaged"
        );
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn plan(n: u32) -> PlanStructure {
        PlanStructure {
            title: "Ошибки селлеров".into(),
            description: None,
            slides: (1..=n)
                .map(|i| Slide {
                    number: i,
                    slide_type: None,
                    headline: format!("Ошибка {i}"),
                    body_text: Some("Проверяйте юнит-экономику".into()),
                    visual_hint: None,
                })
                .collect(),
            cta_final: None,
        }
    }

    fn renderer() -> CarouselRenderer {
        CarouselRenderer::without_fonts(Theme::Dark, "CONTENT FACTORY | WILDBERRIES")
    }

    #[test]
    fn slide_has_canvas_size_and_shapes() {
        let r = renderer();
        let img = r.render_slide(&plan(1).slides[0]);
        assert_eq!(img.dimensions(), (1080, 1350));
        assert_eq!(*img.get_pixel(0, 0), r.palette().bg_start);
        // Accent bar spans (100,50)-(250,60).
        assert_eq!(*img.get_pixel(175, 55), r.palette().accent);
        assert_ne!(*img.get_pixel(175, 70), r.palette().accent);
    }

    #[test]
    fn missing_fonts_do_not_fail_construction() {
        let config = RendererConfig {
            font_bold: "/nonexistent/bold.ttf".into(),
            font_regular: "/nonexistent/regular.ttf".into(),
            ..Default::default()
        };
        let r = CarouselRenderer::new(&config);
        assert!(r.render_png(&plan(1).slides[0]).is_ok());
    }

    #[test]
    fn package_names_entries_by_slide_number() {
        let bundle = renderer().package(&plan(3)).unwrap();
        assert_eq!(bundle.slide_count, 3);

        let mut archive = zip::ZipArchive::new(Cursor::new(bundle.zip.clone())).unwrap();
        let mut names: Vec<String> = archive.file_names().map(String::from).collect();
        names.sort();
        assert_eq!(names, vec!["slide_1.png", "slide_2.png", "slide_3.png"]);

        let mut first = Vec::new();
        archive
            .by_name("slide_1.png")
            .unwrap()
            .read_to_end(&mut first)
            .unwrap();
        assert_eq!(first, bundle.thumbnail);
        assert_eq!(&bundle.thumbnail[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn bundle_ids_are_unique() {
        let r = renderer();
        let a = r.package(&plan(1)).unwrap();
        let b = r.package(&plan(1)).unwrap();
        assert_ne!(a.bundle_id, b.bundle_id);
    }

    #[test]
    fn empty_plan_is_rejected() {
        let err = renderer().package(&plan(0)).unwrap_err();
        assert!(matches!(err, RenderError::NoSlides));
    }
}
