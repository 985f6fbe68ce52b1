//! Recognized game image extensions.

use std::collections::HashSet;

use compact_str::CompactString;

/// Extension of zip containers, whose members are scanned individually.
pub const ZIP_EXTENSION: &str = "zip";

/// Built-in allowlist of cartridge, disk and tape image extensions.
#[rustfmt::skip]
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    // Apogee
    "rka", "rkr", "gam",
    // Apple-II
    "nib", "dsk", "do", "po",
    // Aquarius
    "bin", "caq",
    // Atari800
    "atr", "xex", "xfd", "atx", "car", "rom",
    // BBC Micro, MSX, TSConf, ao486
    "vhd",
    // C16, C64, PET, VIC20
    "prg", "d64", "tap", "t64", "crt",
    // Jupiter Ace
    "ace",
    // QL
    "mvd",
    // SAM Coupe
    "mgt", "img",
    // Specialist
    "rks", "od1",
    // Vector06
    "com", "c00", "edd", "fdd",
    // ZX Spectrum
    "trd", "csw", "tzx", "z80",
    // ZX81
    "o", "p",
    // TRS-80 (ht1080z)
    "cas",
    // Atari 2600 / 5200
    "a26", "a52",
    // ColecoVision, SG-1000
    "col", "sg",
    // Game Boy family
    "gba", "gbc", "gb",
    // Genesis / Mega CD
    "gen", "md", "cue",
    // NES
    "nes", "fds", "nsf",
    // Master System / Game Gear
    "sms", "gg",
    // SNES
    "sfc", "smc",
    // TurboGrafx-16
    "pce", "sgx",
    // Vectrex
    "vec",
];

/// Lowercase extension of the last path segment, without the dot.
///
/// Works on both filesystem names and `/`-separated archive member names.
/// Returns an empty string when the segment has no dot.
pub fn extension_of(name: &str) -> String {
    let segment = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match segment.rfind('.') {
        Some(dot) => segment[dot + 1..].to_ascii_lowercase(),
        None => String::new(),
    }
}

/// Set of extensions whose files are identification candidates.
#[derive(Debug, Clone)]
pub struct ExtensionSet {
    known: HashSet<CompactString>,
}

impl ExtensionSet {
    /// The built-in allowlist.
    pub fn new() -> Self {
        Self::with_extra(std::iter::empty::<&str>())
    }

    /// The built-in allowlist plus `extra` (dots and case are ignored).
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut known: HashSet<CompactString> =
            DEFAULT_EXTENSIONS.iter().map(|e| CompactString::new(e)).collect();
        for ext in extra {
            let ext = ext.as_ref().trim_start_matches('.').to_ascii_lowercase();
            if !ext.is_empty() && ext != ZIP_EXTENSION {
                known.insert(CompactString::from(ext));
            }
        }
        Self { known }
    }

    /// Whether an extension (already lowercased, no dot) is a candidate.
    pub fn is_known(&self, ext: &str) -> bool {
        self.known.contains(ext)
    }

    /// Whether a file or member name has a candidate extension.
    pub fn matches(&self, name: &str) -> bool {
        self.is_known(&extension_of(name))
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}

impl Default for ExtensionSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a name is a zip container.
pub fn is_zip(name: &str) -> bool {
    extension_of(name) == ZIP_EXTENSION
}
