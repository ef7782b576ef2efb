//! Publication sets and QC flag metadata
//!
//! Rows of station data carry a primary QC flag and, for wave and sst data,
//! a secondary release flag. A publication set selects rows by those flags:
//!
//! ```text
//! Set            Rows kept                          Alias
//! ------------------------------------------------------------
//! public-good    primary == 1                       public
//! public-bad     not good and not nonpub-all
//! public-all     not nonpub-all
//! nonpub-all     primary == 4 and secondary == 1    nonpub
//! both-goodall   public-good or nonpub-all          both
//! both-badall    not public-good
//! both-all       every row                          all
//! ```
//!
//! `nonpub-good`, `nonpub-bad`, `both-good` and `both-bad` cannot be told
//! apart with the flags the files carry; they translate to the nearest set.

use std::fmt;

use tracing::warn;

use cdip_dap::Das;

/// Which publication set of rows a request returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PubSet {
    #[default]
    PublicGood,
    PublicBad,
    PublicAll,
    NonpubAll,
    BothGoodall,
    BothBadall,
    BothAll,
}

impl PubSet {
    /// Resolve a set name, its alias, or a translated name. Unknown names
    /// fall back to `public-good`.
    pub fn parse(name: &str) -> PubSet {
        match name {
            "public" | "public-good" => PubSet::PublicGood,
            "public-bad" => PubSet::PublicBad,
            "public-all" => PubSet::PublicAll,
            "nonpub" | "nonpub-all" | "nonpub-good" | "nonpub-bad" => PubSet::NonpubAll,
            "both" | "both-goodall" | "both-good" => PubSet::BothGoodall,
            "both-badall" | "both-bad" => PubSet::BothBadall,
            "both-all" => PubSet::BothAll,
            other => {
                warn!(name = other, "unknown pub set, using public-good");
                PubSet::PublicGood
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PubSet::PublicGood => "public-good",
            PubSet::PublicBad => "public-bad",
            PubSet::PublicAll => "public-all",
            PubSet::NonpubAll => "nonpub-all",
            PubSet::BothGoodall => "both-goodall",
            PubSet::BothBadall => "both-badall",
            PubSet::BothAll => "both-all",
        }
    }

    /// Exclusion mask over rows: true marks a row outside this set.
    ///
    /// A missing secondary flag variable leaves every row outside the
    /// nonpublic set rather than failing the request.
    pub fn row_mask(&self, primary: &[i64], secondary: Option<&[i64]>) -> Vec<bool> {
        let good = |i: usize| primary[i] == 1;
        let nonpub = |i: usize| {
            primary[i] == 4 && secondary.is_some_and(|s| s.get(i).copied() == Some(1))
        };
        (0..primary.len())
            .map(|i| match self {
                PubSet::PublicGood => !good(i),
                PubSet::PublicBad => good(i) || nonpub(i),
                PubSet::PublicAll => nonpub(i),
                PubSet::NonpubAll => !nonpub(i),
                PubSet::BothGoodall => !(good(i) || nonpub(i)),
                PubSet::BothBadall => good(i),
                PubSet::BothAll => false,
            })
            .collect()
    }
}

impl fmt::Display for PubSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category values and their names for one QC flag variable
#[derive(Debug, Clone, PartialEq)]
pub struct FlagCategories {
    pub values: Vec<i64>,
    pub meanings: Vec<String>,
}

impl FlagCategories {
    pub fn label(&self, value: i64) -> &str {
        self.values
            .iter()
            .position(|&v| v == value)
            .and_then(|i| self.meanings.get(i))
            .map_or("unknown", String::as_str)
    }
}

/// Read a flag variable's categories from the DAS. Gps status flags are
/// bitmasks and publish `flag_masks` instead of `flag_values`.
pub fn flag_categories(das: &Das, flag: &str) -> Option<FlagCategories> {
    let key = if flag.starts_with("gps") {
        "flag_masks"
    } else {
        "flag_values"
    };
    let values = das.attr(flag, key)?.ints()?.to_vec();
    let meanings = das
        .str_attr(flag, "flag_meanings")?
        .split_whitespace()
        .map(str::to_string)
        .collect();
    Some(FlagCategories { values, meanings })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases_and_translations() {
        assert_eq!(PubSet::parse("public"), PubSet::PublicGood);
        assert_eq!(PubSet::parse("nonpub"), PubSet::NonpubAll);
        assert_eq!(PubSet::parse("both"), PubSet::BothGoodall);
        assert_eq!(PubSet::parse("nonpub-good"), PubSet::NonpubAll);
        assert_eq!(PubSet::parse("nonpub-bad"), PubSet::NonpubAll);
        assert_eq!(PubSet::parse("both-good"), PubSet::BothGoodall);
        assert_eq!(PubSet::parse("both-bad"), PubSet::BothBadall);
        assert_eq!(PubSet::parse("no-such-set"), PubSet::PublicGood);
    }

    // primary: good, bad, nonpublic-good, missing
    const PRIMARY: [i64; 4] = [1, 3, 4, 9];
    const SECONDARY: [i64; 4] = [0, 0, 1, 0];

    #[test]
    fn test_public_good_keeps_flag_one() {
        let mask = PubSet::PublicGood.row_mask(&PRIMARY, Some(&SECONDARY));
        assert_eq!(mask, vec![false, true, true, true]);
    }

    #[test]
    fn test_nonpub_all_keeps_released_nonpublic() {
        let mask = PubSet::NonpubAll.row_mask(&PRIMARY, Some(&SECONDARY));
        assert_eq!(mask, vec![true, true, false, true]);
    }

    #[test]
    fn test_public_all_excludes_only_nonpublic() {
        let mask = PubSet::PublicAll.row_mask(&PRIMARY, Some(&SECONDARY));
        assert_eq!(mask, vec![false, false, true, false]);
    }

    #[test]
    fn test_both_goodall_unions_good_and_nonpublic() {
        let mask = PubSet::BothGoodall.row_mask(&PRIMARY, Some(&SECONDARY));
        assert_eq!(mask, vec![false, true, false, true]);
    }

    #[test]
    fn test_public_bad_is_the_complement_of_both_goodall() {
        let mask = PubSet::PublicBad.row_mask(&PRIMARY, Some(&SECONDARY));
        assert_eq!(mask, vec![true, false, true, false]);
    }

    #[test]
    fn test_both_badall_excludes_good() {
        let mask = PubSet::BothBadall.row_mask(&PRIMARY, Some(&SECONDARY));
        assert_eq!(mask, vec![true, false, false, false]);
    }

    #[test]
    fn test_both_all_keeps_everything() {
        let mask = PubSet::BothAll.row_mask(&PRIMARY, Some(&SECONDARY));
        assert_eq!(mask, vec![false; 4]);
    }

    #[test]
    fn test_missing_secondary_leaves_nonpublic_empty() {
        let mask = PubSet::NonpubAll.row_mask(&PRIMARY, None);
        assert_eq!(mask, vec![true; 4]);
        // public-good does not consult the secondary flag at all
        let mask = PubSet::PublicGood.row_mask(&PRIMARY, None);
        assert_eq!(mask, vec![false, true, true, true]);
    }

    const FLAG_DAS: &str = r#"Attributes {
    waveFlagPrimary {
        String long_name "primary wave QC flag";
        Byte flag_values 1, 2, 3, 4, 9;
        String flag_meanings "good not_evaluated questionable bad missing";
    }
    gpsStatusFlags {
        Byte flag_masks 1, 2, 4, 8;
        String flag_meanings "module_ok new_fix figure_of_merit heading_valid";
    }
}"#;

    #[test]
    fn test_flag_categories_from_das() {
        let das = Das::parse(FLAG_DAS).unwrap();
        let cats = flag_categories(&das, "waveFlagPrimary").unwrap();
        assert_eq!(cats.values, vec![1, 2, 3, 4, 9]);
        assert_eq!(cats.label(1), "good");
        assert_eq!(cats.label(9), "missing");
        assert_eq!(cats.label(7), "unknown");
    }

    #[test]
    fn test_gps_flags_use_masks() {
        let das = Das::parse(FLAG_DAS).unwrap();
        let cats = flag_categories(&das, "gpsStatusFlags").unwrap();
        assert_eq!(cats.values, vec![1, 2, 4, 8]);
        assert_eq!(cats.label(2), "new_fix");
    }
}
