use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mod {
    NoFail,
    Easy,
    TouchDevice,
    Hidden,
    HardRock,
    SuddenDeath,
    DoubleTime,
    Relax,
    HalfTime,
    Nightcore,
    Flashlight,
    Autoplay,
    SpunOut,
    Autopilot,
    Perfect,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    FadeIn,
    Random,
    Cinema,
    TargetPractice,
    Key9,
    Coop,
    Key1,
    Key3,
    Key2,
    ScoreV2,
    Mirror,
}

pub const NO_FAIL: u32 = 1;
pub const EASY: u32 = 2;
pub const TOUCH_DEVICE: u32 = 4;
pub const HIDDEN: u32 = 8;
pub const HARD_ROCK: u32 = 16;
pub const SUDDEN_DEATH: u32 = 32;
pub const DOUBLE_TIME: u32 = 64;
pub const RELAX: u32 = 128;
pub const HALF_TIME: u32 = 256;
pub const NIGHTCORE: u32 = 512;
pub const FLASHLIGHT: u32 = 1024;
pub const AUTOPLAY: u32 = 2048;
pub const SPUN_OUT: u32 = 4096;
pub const AUTOPILOT: u32 = 8192;
pub const PERFECT: u32 = 16384;
pub const SCORE_V2: u32 = 536_870_912;

/// Bits that change a map's difficulty attributes. Cosmetic/visibility mods
/// such as HD and FL are not part of it.
pub const CORE_DIFFICULTY_MASK: u32 = EASY | HARD_ROCK | DOUBLE_TIME | HALF_TIME;

/// Mods offered by the trainer's planner.
pub const TRAINING_MODS: [Mod; 6] = [
    Mod::Easy,
    Mod::Hidden,
    Mod::HardRock,
    Mod::DoubleTime,
    Mod::HalfTime,
    Mod::Flashlight,
];

// Decoding order: speed and perfect mods are resolved first so their implied
// partners (DT, SD) can be suppressed.
const DECODE_ORDER: [Mod; 31] = [
    Mod::Nightcore,
    Mod::DoubleTime,
    Mod::Perfect,
    Mod::SuddenDeath,
    Mod::Hidden,
    Mod::HardRock,
    Mod::Flashlight,
    Mod::Easy,
    Mod::NoFail,
    Mod::HalfTime,
    Mod::Relax,
    Mod::Autopilot,
    Mod::SpunOut,
    Mod::TouchDevice,
    Mod::Autoplay,
    Mod::Key1,
    Mod::Key2,
    Mod::Key3,
    Mod::Key4,
    Mod::Key5,
    Mod::Key6,
    Mod::Key7,
    Mod::Key8,
    Mod::Key9,
    Mod::FadeIn,
    Mod::Random,
    Mod::Cinema,
    Mod::TargetPractice,
    Mod::Coop,
    Mod::Mirror,
    Mod::ScoreV2,
];

impl Mod {
    pub fn bit(self) -> u32 {
        match self {
            Self::NoFail => NO_FAIL,
            Self::Easy => EASY,
            Self::TouchDevice => TOUCH_DEVICE,
            Self::Hidden => HIDDEN,
            Self::HardRock => HARD_ROCK,
            Self::SuddenDeath => SUDDEN_DEATH,
            Self::DoubleTime => DOUBLE_TIME,
            Self::Relax => RELAX,
            Self::HalfTime => HALF_TIME,
            Self::Nightcore => NIGHTCORE,
            Self::Flashlight => FLASHLIGHT,
            Self::Autoplay => AUTOPLAY,
            Self::SpunOut => SPUN_OUT,
            Self::Autopilot => AUTOPILOT,
            Self::Perfect => PERFECT,
            Self::Key4 => 1 << 15,
            Self::Key5 => 1 << 16,
            Self::Key6 => 1 << 17,
            Self::Key7 => 1 << 18,
            Self::Key8 => 1 << 19,
            Self::FadeIn => 1 << 20,
            Self::Random => 1 << 21,
            Self::Cinema => 1 << 22,
            Self::TargetPractice => 1 << 23,
            Self::Key9 => 1 << 24,
            Self::Coop => 1 << 25,
            Self::Key1 => 1 << 26,
            Self::Key3 => 1 << 27,
            Self::Key2 => 1 << 28,
            Self::ScoreV2 => SCORE_V2,
            Self::Mirror => 1 << 30,
        }
    }

    /// Bits written when this mod is encoded. NC carries DT and PF carries SD.
    pub fn encoded_bits(self) -> u32 {
        match self {
            Self::Nightcore => NIGHTCORE | DOUBLE_TIME,
            Self::Perfect => PERFECT | SUDDEN_DEATH,
            other => other.bit(),
        }
    }

    pub fn acronym(self) -> &'static str {
        match self {
            Self::NoFail => "NF",
            Self::Easy => "EZ",
            Self::TouchDevice => "TD",
            Self::Hidden => "HD",
            Self::HardRock => "HR",
            Self::SuddenDeath => "SD",
            Self::DoubleTime => "DT",
            Self::Relax => "RX",
            Self::HalfTime => "HT",
            Self::Nightcore => "NC",
            Self::Flashlight => "FL",
            Self::Autoplay => "AU",
            Self::SpunOut => "SO",
            Self::Autopilot => "AP",
            Self::Perfect => "PF",
            Self::Key4 => "4K",
            Self::Key5 => "5K",
            Self::Key6 => "6K",
            Self::Key7 => "7K",
            Self::Key8 => "8K",
            Self::FadeIn => "FI",
            Self::Random => "RD",
            Self::Cinema => "CN",
            Self::TargetPractice => "TP",
            Self::Key9 => "9K",
            Self::Coop => "CO",
            Self::Key1 => "1K",
            Self::Key3 => "3K",
            Self::Key2 => "2K",
            Self::ScoreV2 => "V2",
            Self::Mirror => "MR",
        }
    }

    pub fn from_acronym(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_ascii_uppercase();
        DECODE_ORDER
            .iter()
            .copied()
            .find(|candidate| candidate.acronym() == upper)
    }

    /// Mods that cannot be active together with `self`.
    fn exclusive_with(self) -> &'static [Mod] {
        match self {
            Self::DoubleTime => &[Mod::HalfTime, Mod::Nightcore],
            Self::Nightcore => &[Mod::HalfTime, Mod::DoubleTime],
            Self::HalfTime => &[Mod::DoubleTime, Mod::Nightcore],
            Self::HardRock => &[Mod::Easy],
            Self::Easy => &[Mod::HardRock],
            Self::Perfect => &[Mod::SuddenDeath],
            Self::SuddenDeath => &[Mod::Perfect],
            _ => &[],
        }
    }
}

impl fmt::Display for Mod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.acronym())
    }
}

pub fn mods_to_bitmask(mods: &ModSet) -> u32 {
    mods.iter().fold(0, |acc, m| acc | m.encoded_bits())
}

pub fn bitmask_to_mods(bits: u32) -> Vec<Mod> {
    if bits == 0 {
        return Vec::new();
    }

    let mut out = Vec::new();
    for candidate in DECODE_ORDER {
        if bits & candidate.bit() == 0 {
            continue;
        }
        let implied = match candidate {
            Mod::DoubleTime => bits & NIGHTCORE != 0,
            Mod::SuddenDeath => bits & PERFECT != 0,
            _ => false,
        };
        if !implied {
            out.push(candidate);
        }
    }
    out
}

pub fn bitmask_to_acronyms(bits: u32) -> Vec<&'static str> {
    bitmask_to_mods(bits).into_iter().map(Mod::acronym).collect()
}

/// Display form used in listings: concatenated acronyms or `NM`.
pub fn format_mods(bits: u32) -> String {
    let acronyms = bitmask_to_acronyms(bits);
    if acronyms.is_empty() {
        "NM".to_string()
    } else {
        acronyms.concat()
    }
}

pub fn core_mods_match(recommended: u32, played: u32) -> bool {
    recommended & CORE_DIFFICULTY_MASK == played & CORE_DIFFICULTY_MASK
}

/// A legal set of mods. Inserting a mod evicts its exclusive partners, so the
/// set never holds DT+HT, HR+EZ, NC+DT or PF+SD.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ModSet {
    mods: BTreeSet<Mod>,
}

impl ModSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bits(&self) -> u32 {
        mods_to_bitmask(self)
    }

    pub fn insert(&mut self, m: Mod) {
        for other in m.exclusive_with() {
            self.mods.remove(other);
        }
        self.mods.insert(m);
    }

    pub fn remove(&mut self, m: Mod) -> bool {
        self.mods.remove(&m)
    }

    /// Planner button behavior: on if off (evicting conflicts), off if on.
    pub fn toggle(&mut self, m: Mod) {
        if !self.remove(m) {
            self.insert(m);
        }
    }

    pub fn contains(&self, m: Mod) -> bool {
        self.mods.contains(&m)
    }

    pub fn iter(&self) -> impl Iterator<Item = Mod> + '_ {
        self.mods.iter().copied()
    }
}

impl fmt::Display for ModSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_mods(self.bits()))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown mod acronym '{0}'")]
pub struct UnknownMod(pub String);

impl FromStr for ModSet {
    type Err = UnknownMod;

    /// Accepts `HDDT`, `HD,DT`, `hd dt`, `NM` or an empty string.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let compact: String = raw
            .chars()
            .filter(|ch| !ch.is_whitespace() && *ch != ',' && *ch != '+')
            .collect();
        let mut set = ModSet::new();
        if compact.is_empty() || compact.eq_ignore_ascii_case("NM") {
            return Ok(set);
        }

        let chars: Vec<char> = compact.chars().collect();
        if chars.len() % 2 != 0 {
            return Err(UnknownMod(compact));
        }
        for pair in chars.chunks(2) {
            let token: String = pair.iter().collect();
            let m = Mod::from_acronym(&token).ok_or(UnknownMod(token))?;
            set.insert(m);
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, &[])]
    #[case(NIGHTCORE, &["NC"])]
    #[case(NIGHTCORE | DOUBLE_TIME, &["NC"])]
    #[case(PERFECT | SUDDEN_DEATH, &["PF"])]
    #[case(SUDDEN_DEATH, &["SD"])]
    #[case(HIDDEN | DOUBLE_TIME, &["DT", "HD"])]
    #[case(HIDDEN | HARD_ROCK | SCORE_V2, &["HD", "HR", "V2"])]
    fn decodes_bitmask_to_acronyms(#[case] bits: u32, #[case] expected: &[&str]) {
        assert_eq!(bitmask_to_acronyms(bits), expected);
    }

    #[test]
    fn unknown_bits_are_ignored() {
        assert_eq!(bitmask_to_acronyms(1 << 31), Vec::<&str>::new());
        assert_eq!(bitmask_to_acronyms((1 << 31) | HIDDEN), vec!["HD"]);
    }

    #[test]
    fn nightcore_encodes_with_double_time_bit() {
        let set: ModSet = "NC".parse().expect("parse NC");
        assert_eq!(set.bits(), NIGHTCORE | DOUBLE_TIME);
        assert_eq!(set.bits() & CORE_DIFFICULTY_MASK, DOUBLE_TIME);
    }

    #[test]
    fn insert_evicts_exclusive_partner() {
        let mut set = ModSet::new();
        set.insert(Mod::DoubleTime);
        set.insert(Mod::HalfTime);
        assert!(!set.contains(Mod::DoubleTime));
        assert!(set.contains(Mod::HalfTime));

        set.insert(Mod::HardRock);
        set.insert(Mod::Easy);
        assert!(!set.contains(Mod::HardRock));

        set.insert(Mod::Nightcore);
        assert!(!set.contains(Mod::HalfTime));
        set.insert(Mod::DoubleTime);
        assert!(!set.contains(Mod::Nightcore));
    }

    #[test]
    fn toggle_turns_mod_off_when_already_on() {
        let mut set = ModSet::new();
        set.toggle(Mod::Hidden);
        assert!(set.contains(Mod::Hidden));
        set.toggle(Mod::Hidden);
        assert!(set.iter().next().is_none());
    }

    #[rstest]
    #[case("HDDT", "DTHD")]
    #[case("hd,hr", "HDHR")]
    #[case("NM", "NM")]
    #[case("", "NM")]
    #[case("HD DT HT", "HDHT")]
    fn parses_text_mod_lists(#[case] raw: &str, #[case] display: &str) {
        let set: ModSet = raw.parse().expect("mods should parse");
        assert_eq!(set.to_string(), display);
    }

    #[test]
    fn rejects_unknown_acronyms() {
        assert_eq!(
            "HDXX".parse::<ModSet>(),
            Err(UnknownMod("XX".to_string()))
        );
        assert!("HDD".parse::<ModSet>().is_err());
    }

    #[test]
    fn core_match_ignores_cosmetic_mods() {
        assert!(core_mods_match(HIDDEN | DOUBLE_TIME, DOUBLE_TIME | FLASHLIGHT));
        assert!(core_mods_match(
            DOUBLE_TIME,
            NIGHTCORE | DOUBLE_TIME | SCORE_V2
        ));
        assert!(!core_mods_match(DOUBLE_TIME, HALF_TIME));
        assert!(!core_mods_match(0, HARD_ROCK));
    }

    fn arb_mod() -> impl Strategy<Value = Mod> {
        proptest::sample::select(DECODE_ORDER.to_vec())
    }

    proptest! {
        #[test]
        fn bitmask_roundtrip_preserves_legal_sets(picks in proptest::collection::vec(arb_mod(), 0..8)) {
            let mut set = ModSet::new();
            for m in picks {
                set.insert(m);
            }
            let decoded: BTreeSet<Mod> = bitmask_to_mods(mods_to_bitmask(&set)).into_iter().collect();
            let original: BTreeSet<Mod> = set.iter().collect();
            prop_assert_eq!(decoded, original);
        }
    }
}
