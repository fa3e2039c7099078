use content_factory_common::Theme;
use image::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub bg_start: Rgb<u8>,
    pub bg_end: Rgb<u8>,
    pub text: Rgb<u8>,
    pub accent: Rgb<u8>,
    pub muted: Rgb<u8>,
}

const WB_PINK: Rgb<u8> = Rgb([0xcb, 0x11, 0xab]);

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                bg_start: Rgb([0x1a, 0x1a, 0x1a]),
                bg_end: Rgb([0x2d, 0x0b, 0x31]),
                text: Rgb([0xff, 0xff, 0xff]),
                accent: WB_PINK,
                muted: Rgb([0xa0, 0xa0, 0xa0]),
            },
            Theme::Light => Self {
                bg_start: Rgb([0xff, 0xff, 0xff]),
                bg_end: Rgb([0xf0, 0xf0, 0xf0]),
                text: Rgb([0x00, 0x00, 0x00]),
                accent: WB_PINK,
                muted: Rgb([0x66, 0x66, 0x66]),
            },
        }
    }

    /// Background color of row `y` in a vertical gradient of `height` rows.
    pub fn gradient_at(&self, y: u32, height: u32) -> Rgb<u8> {
        let t = y as f64 / height.max(1) as f64;
        let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t) as u8;
        let (s, e) = (self.bg_start.0, self.bg_end.0);
        Rgb([lerp(s[0], e[0]), lerp(s[1], e[1]), lerp(s[2], e[2])])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_starts_at_bg_start() {
        let p = Palette::for_theme(Theme::Dark);
        assert_eq!(p.gradient_at(0, 1350), p.bg_start);
    }

    #[test]
    fn gradient_approaches_bg_end() {
        let p = Palette::for_theme(Theme::Dark);
        let last = p.gradient_at(1349, 1350);
        // 0x2d, 0x0b, 0x31 approached from 0x1a: truncation keeps us one step short at most.
        assert!((last.0[0] as i32 - 0x2d).abs() <= 1);
        assert!((last.0[2] as i32 - 0x31).abs() <= 1);
    }

    #[test]
    fn light_theme_keeps_brand_accent() {
        let p = Palette::for_theme(Theme::Light);
        assert_eq!(p.accent, WB_PINK);
        assert_eq!(p.text, Rgb([0, 0, 0]));
    }
}
