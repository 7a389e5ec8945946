use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-up rounding to 2 decimals: `Int(100*x + 0.5) / 100`.
pub fn round_off_2_decimals(x: f64) -> f64 {
    ((100.0 * x) + 0.5).floor() / 100.0
}

/// Half-up rounding to 1 decimal, used for headline averages.
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn as_str(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }

    pub fn parse(raw: &str) -> Option<Grade> {
        match raw {
            "A+" => Some(Grade::APlus),
            "A" => Some(Grade::A),
            "B+" => Some(Grade::BPlus),
            "B" => Some(Grade::B),
            "C" => Some(Grade::C),
            "D" => Some(Grade::D),
            "F" => Some(Grade::F),
            _ => None,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Letter grade for a percentage; each threshold is an inclusive lower bound.
pub fn grade_for_percentage(percentage: f64) -> Grade {
    if percentage >= 90.0 {
        Grade::APlus
    } else if percentage >= 80.0 {
        Grade::A
    } else if percentage >= 70.0 {
        Grade::BPlus
    } else if percentage >= 60.0 {
        Grade::B
    } else if percentage >= 50.0 {
        Grade::C
    } else if percentage >= 40.0 {
        Grade::D
    } else {
        Grade::F
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Derived {
    pub percentage: f64,
    pub grade: Grade,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvalidInput {
    pub message: &'static str,
    pub obtained: f64,
    pub total: f64,
}

/// Percentage and grade for a score. Every write path goes through here.
pub fn derive(obtained: f64, total: f64) -> Result<Derived, InvalidInput> {
    let fail = |message| InvalidInput {
        message,
        obtained,
        total,
    };
    if !obtained.is_finite() || !total.is_finite() {
        return Err(fail("marks must be finite numbers"));
    }
    if total <= 0.0 {
        return Err(fail("total marks must be greater than 0"));
    }
    if obtained < 0.0 {
        return Err(fail("marks obtained must not be negative"));
    }
    if obtained > total {
        return Err(fail("marks obtained cannot exceed total marks"));
    }

    let percentage = round_off_2_decimals(obtained / total * 100.0);
    Ok(Derived {
        percentage,
        grade: grade_for_percentage(percentage),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_off_is_half_up() {
        assert_eq!(round_off_2_decimals(0.0), 0.0);
        assert_eq!(round_off_2_decimals(66.666_666), 66.67);
        assert_eq!(round_off_2_decimals(12.344), 12.34);
        assert_eq!(round_off_2_decimals(12.125), 12.13);
        assert_eq!(round_off_1_decimal(35.6818), 35.7);
        assert_eq!(round_off_1_decimal(3.54), 3.5);
    }

    #[test]
    fn forty_five_of_fifty_is_a_plus() {
        let d = derive(45.0, 50.0).expect("derive");
        assert_eq!(d.percentage, 90.0);
        assert_eq!(d.grade, Grade::APlus);
    }

    #[test]
    fn thresholds_hold_at_boundaries() {
        let cases = [
            (90.0, Grade::APlus),
            (89.99, Grade::A),
            (80.0, Grade::A),
            (79.99, Grade::BPlus),
            (70.0, Grade::BPlus),
            (69.99, Grade::B),
            (60.0, Grade::B),
            (59.99, Grade::C),
            (50.0, Grade::C),
            (49.99, Grade::D),
            (40.0, Grade::D),
            (39.99, Grade::F),
            (0.0, Grade::F),
            (100.0, Grade::APlus),
        ];
        for (pct, expected) in cases {
            assert_eq!(grade_for_percentage(pct), expected, "pct={pct}");
        }
    }

    #[test]
    fn derive_rounds_percentage_to_two_decimals() {
        let d = derive(2.0, 3.0).expect("derive");
        assert_eq!(d.percentage, 66.67);
        assert_eq!(d.grade, Grade::B);

        let d = derive(8999.0, 10000.0).expect("derive");
        assert_eq!(d.percentage, 89.99);
        assert_eq!(d.grade, Grade::A);

        let d = derive(0.0, 20.0).expect("derive");
        assert_eq!(d.percentage, 0.0);
        assert_eq!(d.grade, Grade::F);
    }

    #[test]
    fn derive_rejects_invariant_breaches() {
        assert!(derive(51.0, 50.0).is_err());
        assert!(derive(1.0, 0.0).is_err());
        assert!(derive(0.0, -5.0).is_err());
        assert!(derive(-1.0, 10.0).is_err());
        assert!(derive(f64::NAN, 10.0).is_err());
        let e = derive(51.0, 50.0).unwrap_err();
        assert!(e.message.contains("exceed"));
    }

    #[test]
    fn derive_is_bit_identical_across_calls() {
        for (o, t) in [(17.0, 23.0), (1.0, 3.0), (33.3, 47.1), (49.0, 50.0)] {
            let a = derive(o, t).expect("derive");
            let b = derive(o, t).expect("derive");
            assert_eq!(a.percentage.to_bits(), b.percentage.to_bits());
            assert_eq!(a.grade, b.grade);
        }
    }

    #[test]
    fn grade_round_trips_through_text() {
        for g in [Grade::APlus, Grade::A, Grade::BPlus, Grade::B, Grade::C, Grade::D, Grade::F] {
            assert_eq!(Grade::parse(g.as_str()), Some(g));
        }
        assert_eq!(Grade::parse("E"), None);
    }
}
