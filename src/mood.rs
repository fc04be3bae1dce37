//! Emotion → harmony mapping: scales, chord progression, tempo.

/// Harmonic palette families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Major,
    Minor,
    Dramatic,
    Cinematic,
}

const MAJOR: [f64; 4] = [1.0, 1.25, 1.5, 2.0];
const MINOR: [f64; 4] = [1.0, 1.2, 1.5, 2.0];
const DRAMATIC: [f64; 5] = [1.0, 1.2, 1.5, 1.73, 2.0];
const CINEMATIC: [f64; 5] = [1.0, 1.2, 1.33, 1.5, 1.88];

/// Scale degrees visited per measure, cycling.
pub const PROGRESSION: [usize; 4] = [0, 3, 4, 1];

impl Scale {
    /// Frequency ratios relative to the root.
    pub fn ratios(self) -> &'static [f64] {
        match self {
            Scale::Major => &MAJOR,
            Scale::Minor => &MINOR,
            Scale::Dramatic => &DRAMATIC,
            Scale::Cinematic => &CINEMATIC,
        }
    }
}

/// Root, scale and tempo derived from an emotion label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmotionProfile {
    pub root_frequency: f64,
    pub scale: Scale,
    pub tempo: f64,
}

/// Root/third/fifth frequencies of one measure's chord.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chord {
    pub root: f64,
    pub third: f64,
    pub fifth: f64,
}

impl EmotionProfile {
    /// Case-insensitive substring match; first family that matches wins.
    pub fn from_label(label: &str) -> Self {
        let e = label.to_lowercase();
        let has = |keys: &[&str]| keys.iter().any(|k| e.contains(k));

        if has(&["sad", "sorrow"]) {
            EmotionProfile {
                root_frequency: 220.00,
                scale: Scale::Minor,
                tempo: 50.0,
            }
        } else if has(&["happy", "joy", "excited"]) {
            EmotionProfile {
                root_frequency: 293.66,
                scale: Scale::Major,
                tempo: 90.0,
            }
        } else if has(&["fear", "drama", "intense"]) {
            EmotionProfile {
                root_frequency: 146.83,
                scale: Scale::Dramatic,
                tempo: 70.0,
            }
        } else {
            EmotionProfile {
                root_frequency: 261.63,
                scale: Scale::Major,
                tempo: 60.0,
            }
        }
    }

    /// Seconds per beat.
    pub fn beat_time(&self) -> f64 {
        60.0 / self.tempo
    }

    /// Seconds per 4/4 measure.
    pub fn measure_time(&self) -> f64 {
        self.beat_time() * 4.0
    }

    /// Frequency of a scale degree, wrapping around the scale length.
    pub fn note(&self, degree: usize) -> f64 {
        let ratios = self.scale.ratios();
        self.root_frequency * ratios[degree % ratios.len()]
    }

    /// The triad for measure `m`.
    pub fn chord(&self, m: usize) -> Chord {
        let degree = PROGRESSION[m % PROGRESSION.len()];
        Chord {
            root: self.note(degree),
            third: self.note(degree + 1),
            fifth: self.note(degree + 2),
        }
    }
}
