//! Height/intensity to color mapping.

use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Nearest entry of the xterm 256-color cube (indices 16..=231).
    pub fn to_ansi256(self) -> u8 {
        let level = |c: u8| ((c as u16 * 5 + 127) / 255) as u8;
        16 + 36 * level(self.r) + 6 * level(self.g) + level(self.b)
    }

    fn lerp(a: Rgb, b: Rgb, t: f32) -> Rgb {
        let mix = |x: u8, y: u8| {
            (x as f32 + (y as f32 - x as f32) * t)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Rgb::new(mix(a.r, b.r), mix(a.g, b.g), mix(a.b, b.b))
    }
}

/// How a colormap turns `t` into a color.
enum Gradient {
    /// Piecewise-linear between evenly spaced anchors.
    Anchors(&'static [Rgb]),
    /// Linear hue sweep in degrees at full saturation and value.
    HueSweep { from: f32, to: f32 },
}

const CLASSIC: [Rgb; 3] = [
    Rgb::new(0, 200, 0),
    Rgb::new(230, 220, 0),
    Rgb::new(230, 30, 20),
];

const WARM: [Rgb; 4] = [
    Rgb::new(60, 0, 0),
    Rgb::new(200, 30, 0),
    Rgb::new(255, 140, 0),
    Rgb::new(255, 240, 150),
];

const COOL: [Rgb; 4] = [
    Rgb::new(0, 20, 80),
    Rgb::new(0, 100, 200),
    Rgb::new(0, 210, 220),
    Rgb::new(210, 255, 255),
];

const MONO: [Rgb; 2] = [Rgb::new(0, 70, 30), Rgb::new(120, 255, 160)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Colormap {
    /// Green, yellow, red
    #[default]
    Classic,
    /// Dark red through orange to pale yellow
    Warm,
    /// Navy through blue and cyan to white
    Cool,
    /// Full hue sweep from blue to red
    Spectrum,
    /// Single green hue
    Mono,
}

impl Colormap {
    pub const ALL: [Colormap; 5] = [
        Colormap::Classic,
        Colormap::Warm,
        Colormap::Cool,
        Colormap::Spectrum,
        Colormap::Mono,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Colormap::Classic => "classic",
            Colormap::Warm => "warm",
            Colormap::Cool => "cool",
            Colormap::Spectrum => "spectrum",
            Colormap::Mono => "mono",
        }
    }

    /// The next variant in cycling order, wrapping around.
    pub fn next(self) -> Colormap {
        let index = Self::ALL.iter().position(|&c| c == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    fn gradient(self) -> Gradient {
        match self {
            Colormap::Classic => Gradient::Anchors(&CLASSIC),
            Colormap::Warm => Gradient::Anchors(&WARM),
            Colormap::Cool => Gradient::Anchors(&COOL),
            Colormap::Spectrum => Gradient::HueSweep { from: 240.0, to: 0.0 },
            Colormap::Mono => Gradient::Anchors(&MONO),
        }
    }

    /// Color for a normalized height or intensity `t`; clamped to [0, 1].
    pub fn color_for(self, t: f32) -> Rgb {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self.gradient() {
            Gradient::Anchors(anchors) => {
                let segments = anchors.len() - 1;
                let position = t * segments as f32;
                let index = (position.floor() as usize).min(segments - 1);
                Rgb::lerp(anchors[index], anchors[index + 1], position - index as f32)
            }
            Gradient::HueSweep { from, to } => hsv_to_rgb(from + (to - from) * t, 1.0, 1.0),
        }
    }
}

/// Hue in degrees, saturation and value in [0, 1].
fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> Rgb {
    let h = hue.rem_euclid(360.0) / 60.0;
    let c = value * saturation;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let m = value - c;
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let to_byte = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb::new(to_byte(r), to_byte(g), to_byte(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distance(a: Rgb, b: Rgb) -> u8 {
        a.r.abs_diff(b.r).max(a.g.abs_diff(b.g)).max(a.b.abs_diff(b.b))
    }

    #[test]
    fn test_endpoints_are_exact() {
        assert_eq!(Colormap::Classic.color_for(0.0), CLASSIC[0]);
        assert_eq!(Colormap::Classic.color_for(1.0), CLASSIC[2]);
        assert_eq!(Colormap::Warm.color_for(1.0), WARM[3]);
        assert_eq!(Colormap::Cool.color_for(0.0), COOL[0]);
        assert_eq!(Colormap::Mono.color_for(1.0), MONO[1]);
        assert_eq!(Colormap::Spectrum.color_for(0.0), Rgb::new(0, 0, 255));
        assert_eq!(Colormap::Spectrum.color_for(1.0), Rgb::new(255, 0, 0));
    }

    #[test]
    fn test_every_variant_is_continuous() {
        for colormap in Colormap::ALL {
            let mut previous = colormap.color_for(0.0);
            for step in 1..=1000 {
                let color = colormap.color_for(step as f32 / 1000.0);
                assert!(
                    distance(previous, color) <= 3,
                    "{} jumps at t={}",
                    colormap.name(),
                    step as f32 / 1000.0
                );
                previous = color;
            }
        }
    }

    #[test]
    fn test_internal_anchor_is_hit() {
        assert_eq!(Colormap::Classic.color_for(0.5), CLASSIC[1]);
        assert_eq!(Colormap::Spectrum.color_for(0.5), Rgb::new(0, 255, 0));
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(Colormap::Warm.color_for(-3.0), WARM[0]);
        assert_eq!(Colormap::Warm.color_for(7.0), WARM[3]);
        assert_eq!(Colormap::Warm.color_for(f32::NAN), WARM[0]);
    }

    #[test]
    fn test_cycle_visits_every_variant() {
        let mut colormap = Colormap::Classic;
        for expected in Colormap::ALL.iter().cycle().skip(1).take(5) {
            colormap = colormap.next();
            assert_eq!(colormap, *expected);
        }
        assert_eq!(colormap, Colormap::Classic);
    }

    #[test]
    fn test_ansi256_cube_corners() {
        assert_eq!(Rgb::new(0, 0, 0).to_ansi256(), 16);
        assert_eq!(Rgb::new(255, 255, 255).to_ansi256(), 231);
        assert_eq!(Rgb::new(255, 0, 0).to_ansi256(), 196);
    }
}
