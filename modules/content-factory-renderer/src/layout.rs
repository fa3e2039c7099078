//! Slide layout as a list of draw operations, independent of fonts and pixels.

use content_factory_common::Slide;

use crate::wrap::wrap_text;

pub const WIDTH: u32 = 1080;
pub const HEIGHT: u32 = 1350;
pub const MARGIN: i32 = 100;

const ACCENT_BAR: (i32, i32, i32, i32) = (MARGIN, 50, MARGIN + 150, 60);
const HEADLINE_TOP: i32 = 150;
const HEADLINE_WRAP: usize = 18;
const HEADLINE_ADVANCE: i32 = 100;
const BODY_GAP: i32 = 50;
const DIVIDER_LENGTH: i32 = 100;
const DIVIDER_THICKNESS: u32 = 3;
const BODY_WRAP: usize = 35;
const BODY_ADVANCE: i32 = 60;

pub const HEADLINE_SIZE: f32 = 80.0;
pub const NUMBER_SIZE: f32 = 60.0;
pub const BODY_SIZE: f32 = 45.0;
pub const FOOTER_SIZE: f32 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weight {
    Bold,
    Regular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ink {
    Text,
    Accent,
    Muted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Filled rectangle, corners inclusive.
    Rect { x0: i32, y0: i32, x1: i32, y1: i32, ink: Ink },
    Text {
        x: i32,
        y: i32,
        size: f32,
        weight: Weight,
        ink: Ink,
        text: String,
    },
}

fn text(x: i32, y: i32, size: f32, weight: Weight, ink: Ink, s: impl Into<String>) -> DrawOp {
    DrawOp::Text {
        x,
        y,
        size,
        weight,
        ink,
        text: s.into(),
    }
}

pub fn layout_slide(slide: &Slide, footer: &str) -> Vec<DrawOp> {
    let (x0, y0, x1, y1) = ACCENT_BAR;
    let mut ops = vec![DrawOp::Rect { x0, y0, x1, y1, ink: Ink::Accent }];

    let mut y = HEADLINE_TOP;
    for line in wrap_text(&slide.headline.to_uppercase(), HEADLINE_WRAP) {
        ops.push(text(MARGIN, y, HEADLINE_SIZE, Weight::Bold, Ink::Text, line));
        y += HEADLINE_ADVANCE;
    }

    if let Some(body) = slide.body() {
        y += BODY_GAP;
        let half = (DIVIDER_THICKNESS / 2) as i32;
        ops.push(DrawOp::Rect {
            x0: MARGIN,
            y0: y - half,
            x1: MARGIN + DIVIDER_LENGTH,
            y1: y - half + DIVIDER_THICKNESS as i32 - 1,
            ink: Ink::Accent,
        });
        y += BODY_GAP;
        for line in wrap_text(body, BODY_WRAP) {
            ops.push(text(MARGIN, y, BODY_SIZE, Weight::Regular, Ink::Text, line));
            y += BODY_ADVANCE;
        }
    }

    let bottom = HEIGHT as i32 - MARGIN;
    ops.push(text(
        WIDTH as i32 - MARGIN - 50,
        bottom,
        NUMBER_SIZE,
        Weight::Bold,
        Ink::Accent,
        slide.number.max(1).to_string(),
    ));
    if !footer.is_empty() {
        ops.push(text(MARGIN, bottom, FOOTER_SIZE, Weight::Regular, Ink::Muted, footer));
    }

    ops
}
