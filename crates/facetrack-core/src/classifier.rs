//! Skin-tone pixel classification.
//!
//! Three independent heuristics (RGB range, relaxed RGB range, hue band)
//! are OR'ed together. The thresholds are demo grade and carry no accuracy
//! guarantee.

/// Which of the classifier rules accepted a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SkinRules {
    pub basic: bool,
    pub alternate: bool,
    pub hue: bool,
}

impl SkinRules {
    /// Evaluate every rule for one pixel.
    pub fn evaluate(r: u8, g: u8, b: u8) -> Self {
        Self {
            basic: basic_rule(r, g, b),
            alternate: alternate_rule(r, g, b),
            hue: hue_rule(r, g, b),
        }
    }

    pub fn any(&self) -> bool {
        self.basic || self.alternate || self.hue
    }
}

/// Returns true if the pixel passes any skin-tone rule.
#[inline]
pub fn is_skin_tone(r: u8, g: u8, b: u8) -> bool {
    basic_rule(r, g, b) || alternate_rule(r, g, b) || hue_rule(r, g, b)
}

fn basic_rule(r: u8, g: u8, b: u8) -> bool {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    r > 95
        && g > 40
        && b > 20
        && max - min > 15
        && r.abs_diff(g) > 15
        && r > g
        && r > b
}

fn alternate_rule(r: u8, g: u8, b: u8) -> bool {
    // r > g and r > b guard the subtractions
    r > 60 && g > 30 && b > 15 && r > g && r > b && r - g > 10 && r - b > 10
}

fn hue_rule(r: u8, g: u8, b: u8) -> bool {
    let max = r.max(g).max(b);
    if max <= 80 {
        return false;
    }
    match hue_degrees(r, g, b) {
        Some(h) => h <= 50.0 || h >= 300.0,
        None => false,
    }
}

/// Hue in degrees `[0, 360)`, or `None` for achromatic pixels.
pub fn hue_degrees(r: u8, g: u8, b: u8) -> Option<f32> {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;
    if delta == 0.0 {
        return None;
    }

    let sector = if max == rf {
        ((gf - bf) / delta).rem_euclid(6.0)
    } else if max == gf {
        (bf - rf) / delta + 2.0
    } else {
        (rf - gf) / delta + 4.0
    };

    Some(sector * 60.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_rule_accepts_reference_pixel() {
        assert!(is_skin_tone(150, 100, 60));
        assert!(SkinRules::evaluate(150, 100, 60).basic);
    }

    #[test]
    fn test_classifier_is_deterministic() {
        let first = is_skin_tone(150, 100, 60);
        for _ in 0..100 {
            assert_eq!(is_skin_tone(150, 100, 60), first);
        }
    }

    #[test]
    fn test_alternate_rule_only() {
        // Too dark for the basic and hue rules.
        let rules = SkinRules::evaluate(70, 40, 30);
        assert!(!rules.basic);
        assert!(rules.alternate);
        assert!(!rules.hue);
        assert!(is_skin_tone(70, 40, 30));
    }

    #[test]
    fn test_hue_rule_only() {
        // Green channel too low for either RGB rule, hue ~335°.
        let rules = SkinRules::evaluate(200, 30, 100);
        assert!(!rules.basic);
        assert!(!rules.alternate);
        assert!(rules.hue);
    }

    #[test]
    fn test_hue_rule_needs_bright_max_channel() {
        // Same hue band as above but max channel below 81.
        assert!(!hue_rule(80, 12, 40));
    }

    #[test]
    fn test_rejects_background_colors() {
        assert!(!is_skin_tone(30, 30, 30));
        assert!(!is_skin_tone(30, 60, 200));
        assert!(!is_skin_tone(20, 180, 40));
    }

    #[test]
    fn test_achromatic_has_no_hue() {
        assert_eq!(hue_degrees(200, 200, 200), None);
        assert!(!is_skin_tone(200, 200, 200));
        assert!(!is_skin_tone(255, 255, 255));
    }

    #[test]
    fn test_hue_primaries() {
        assert_eq!(hue_degrees(255, 0, 0), Some(0.0));
        assert_eq!(hue_degrees(0, 255, 0), Some(120.0));
        assert_eq!(hue_degrees(0, 0, 255), Some(240.0));
        let magenta = hue_degrees(255, 0, 255).unwrap();
        assert!((magenta - 300.0).abs() < 1e-3);
    }

    #[test]
    fn test_any_matches_is_skin_tone() {
        for &(r, g, b) in &[(150, 100, 60), (30, 30, 30), (200, 30, 100), (70, 40, 30)] {
            assert_eq!(SkinRules::evaluate(r, g, b).any(), is_skin_tone(r, g, b));
        }
    }
}
