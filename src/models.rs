//! Data models for the report generator.
//!
//! This module contains the core data structures for representing
//! test outcomes, dated snapshots, and the per-package facts inferred
//! from them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A target OS/environment packages are tested against.
///
/// The order of [`Distribution::ALL`] is the matching order: more specific
/// names come first so that e.g. `amazon-linux2023` is not shadowed by
/// `amazon-linux2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Distribution {
    AmazonLinux2023,
    AmazonLinux2,
    Centos8,
    Focal,
    Jammy,
    Noble,
    Resolute,
}

impl Distribution {
    /// All known distributions, in substring-matching order.
    pub const ALL: [Distribution; 7] = [
        Distribution::AmazonLinux2023,
        Distribution::AmazonLinux2,
        Distribution::Centos8,
        Distribution::Focal,
        Distribution::Jammy,
        Distribution::Noble,
        Distribution::Resolute,
    ];

    /// The name as it appears inside test names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Distribution::AmazonLinux2023 => "amazon-linux2023",
            Distribution::AmazonLinux2 => "amazon-linux2",
            Distribution::Centos8 => "centos8",
            Distribution::Focal => "focal",
            Distribution::Jammy => "jammy",
            Distribution::Noble => "noble",
            Distribution::Resolute => "resolute",
        }
    }

    /// Infer the distribution from a test name, e.g. `jammy-pip` -> `Jammy`.
    ///
    /// Returns the first entry of [`Distribution::ALL`] found as a substring,
    /// or `None` when the test name carries no recognized distribution.
    pub fn from_test_name(test_name: &str) -> Option<Distribution> {
        Distribution::ALL
            .into_iter()
            .find(|d| test_name.contains(d.as_str()))
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The package manager a test installs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Pip,
    Apt,
    Yum,
    Conda,
}

impl PackageManager {
    /// Infer the package manager from a test name. `pip` is the default when
    /// none of the OS package managers match.
    pub fn from_test_name(test_name: &str) -> PackageManager {
        for (needle, pm) in [
            ("yum", PackageManager::Yum),
            ("apt", PackageManager::Apt),
            ("conda", PackageManager::Conda),
        ] {
            if test_name.contains(needle) {
                return pm;
            }
        }
        PackageManager::Pip
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageManager::Pip => write!(f, "pip"),
            PackageManager::Apt => write!(f, "apt"),
            PackageManager::Yum => write!(f, "yum"),
            PackageManager::Conda => write!(f, "conda"),
        }
    }
}

/// One (package, test name) result as stored in a result file.
///
/// Immutable once parsed; only `test-passed` is required in the payload,
/// everything else defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestOutcome {
    /// Whether the installation test passed.
    #[serde(rename = "test-passed")]
    pub passed: bool,

    /// Whether the test was killed by the timeout.
    #[serde(rename = "timeout", default)]
    pub timed_out: bool,

    /// Whether the install fell back to building from source.
    #[serde(rename = "build-required", default)]
    pub build_required: bool,

    /// Whether a prebuilt binary wheel was used.
    #[serde(rename = "binary-wheel", default)]
    pub binary_wheel: bool,

    /// Whether the install exceeded the slow-install threshold.
    #[serde(rename = "slow-install", default)]
    pub slow_install: bool,

    /// The version that was installed, when known.
    #[serde(rename = "installed-version", default)]
    pub installed_version: Option<String>,

    /// The latest released version, when known.
    #[serde(rename = "latest-version", default)]
    pub latest_version: Option<String>,

    /// Wall-clock runtime of the test in seconds.
    #[serde(default)]
    pub runtime: f64,

    /// Captured installer output.
    #[serde(default)]
    pub output: String,
}

impl TestOutcome {
    /// A test counts against a package when it failed outright or timed out.
    pub fn needs_attention(&self) -> bool {
        !self.passed || self.timed_out
    }
}

/// Mapping from test name to outcome, for one package in one snapshot.
pub type PackageResults = BTreeMap<String, TestOutcome>;

/// Per-package facts inferred from one snapshot.
#[derive(Debug, Clone)]
pub struct PackageDerived {
    /// OR-fold of `passed` across package managers, keyed by distribution.
    /// Tests with no recognized distribution land in the `None` bucket.
    pub passed_by_distribution: BTreeMap<Option<Distribution>, bool>,

    /// True iff no distribution in the folded map is `false`. A package with
    /// no recognized tests at all takes the configured vacuous-truth policy.
    pub every_distribution_passing: bool,
}

impl PackageDerived {
    /// Fold the outcomes of one package. `untested_is_passing` decides the
    /// empty-map case.
    pub fn infer(results: &PackageResults, untested_is_passing: bool) -> Self {
        let mut passed_by_distribution: BTreeMap<Option<Distribution>, bool> = BTreeMap::new();
        for (test_name, outcome) in results {
            let distro = Distribution::from_test_name(test_name);
            let entry = passed_by_distribution.entry(distro).or_insert(false);
            *entry |= outcome.passed;
        }

        let every_distribution_passing = if passed_by_distribution.is_empty() {
            untested_is_passing
        } else {
            passed_by_distribution.values().all(|&passed| passed)
        };

        Self {
            passed_by_distribution,
            every_distribution_passing,
        }
    }

    /// Distributions whose folded result is `false`, i.e. where no
    /// package manager gives a passing install.
    pub fn failing_distributions(&self) -> impl Iterator<Item = Option<Distribution>> + '_ {
        self.passed_by_distribution
            .iter()
            .filter(|(_, passed)| !**passed)
            .map(|(distro, _)| *distro)
    }
}

/// One dated test run: every package with every test outcome, plus the
/// per-package facts inferred at load time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Timestamp parsed from the source file name.
    pub timestamp: NaiveDateTime,
    /// The source file name, kept for diagnostics.
    pub source: String,
    /// All package results in this run.
    pub packages: BTreeMap<String, PackageResults>,
    /// Inferred facts, one entry per package.
    derived: BTreeMap<String, PackageDerived>,
}

impl Snapshot {
    /// Build a snapshot and infer the per-package metadata once.
    pub fn new(
        timestamp: NaiveDateTime,
        source: String,
        packages: BTreeMap<String, PackageResults>,
        untested_is_passing: bool,
    ) -> Self {
        let derived = packages
            .iter()
            .map(|(name, results)| {
                (
                    name.clone(),
                    PackageDerived::infer(results, untested_is_passing),
                )
            })
            .collect();

        Self {
            timestamp,
            source,
            packages,
            derived,
        }
    }

    /// The inferred facts for one package, if it appears in this snapshot.
    pub fn derived(&self, package: &str) -> Option<&PackageDerived> {
        self.derived.get(package)
    }

    /// Number of packages in this run.
    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    /// Packages with at least one failed test in this run.
    pub fn failing_package_count(&self) -> usize {
        self.packages
            .values()
            .filter(|results| results.values().any(|outcome| !outcome.passed))
            .count()
    }

    /// Packages where every distribution has a passing option.
    pub fn distro_passing_count(&self) -> usize {
        self.derived
            .values()
            .filter(|d| d.every_distribution_passing)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(passed: bool) -> TestOutcome {
        TestOutcome {
            passed,
            ..TestOutcome::default()
        }
    }

    #[test]
    fn test_distribution_from_test_name() {
        assert_eq!(
            Distribution::from_test_name("jammy-pip"),
            Some(Distribution::Jammy)
        );
        assert_eq!(
            Distribution::from_test_name("noble-apt"),
            Some(Distribution::Noble)
        );
        assert_eq!(Distribution::from_test_name("centos-python38"), None);
    }

    #[test]
    fn test_distribution_most_specific_first() {
        // amazon-linux2 is a substring of amazon-linux2023; the longer name
        // must win.
        assert_eq!(
            Distribution::from_test_name("amazon-linux2023-yum"),
            Some(Distribution::AmazonLinux2023)
        );
        assert_eq!(
            Distribution::from_test_name("amazon-linux2-pip"),
            Some(Distribution::AmazonLinux2)
        );
    }

    #[test]
    fn test_package_manager_defaults_to_pip() {
        assert_eq!(
            PackageManager::from_test_name("jammy-apt"),
            PackageManager::Apt
        );
        assert_eq!(
            PackageManager::from_test_name("amazon-linux2023-yum"),
            PackageManager::Yum
        );
        assert_eq!(
            PackageManager::from_test_name("focal-conda"),
            PackageManager::Conda
        );
        assert_eq!(PackageManager::from_test_name("jammy"), PackageManager::Pip);
    }

    #[test]
    fn test_outcome_parses_payload_fields() {
        let json = r#"{
            "test-passed": true,
            "build-required": false,
            "binary-wheel": true,
            "slow-install": false,
            "timeout": false,
            "installed-version": "1.26.4",
            "latest-version": null,
            "runtime": 12.5,
            "output": "ok"
        }"#;
        let outcome: TestOutcome = serde_json::from_str(json).unwrap();
        assert!(outcome.passed);
        assert!(outcome.binary_wheel);
        assert_eq!(outcome.installed_version.as_deref(), Some("1.26.4"));
        assert_eq!(outcome.latest_version, None);
        assert_eq!(outcome.runtime, 12.5);
    }

    #[test]
    fn test_derived_or_folds_across_package_managers() {
        let mut results = PackageResults::new();
        results.insert("jammy-pip".to_string(), outcome(false));
        results.insert("jammy-apt".to_string(), outcome(true));
        results.insert("noble-pip".to_string(), outcome(true));

        let derived = PackageDerived::infer(&results, true);
        assert_eq!(
            derived
                .passed_by_distribution
                .get(&Some(Distribution::Jammy)),
            Some(&true)
        );
        assert!(derived.every_distribution_passing);
    }

    #[test]
    fn test_derived_one_failing_distribution_flips_flag() {
        let mut results = PackageResults::new();
        results.insert("jammy-pip".to_string(), outcome(true));
        results.insert("noble-pip".to_string(), outcome(false));

        let derived = PackageDerived::infer(&results, true);
        assert!(!derived.every_distribution_passing);
    }

    #[test]
    fn test_failing_distributions_lists_folded_false_entries() {
        let mut results = PackageResults::new();
        results.insert("jammy-pip".to_string(), outcome(false));
        results.insert("jammy-apt".to_string(), outcome(false));
        results.insert("noble-pip".to_string(), outcome(true));
        results.insert("centos-python38".to_string(), outcome(false));

        let derived = PackageDerived::infer(&results, true);
        // Option's ordering puts the unrecognized bucket first.
        let failing: Vec<Option<Distribution>> = derived.failing_distributions().collect();
        assert_eq!(failing, vec![None, Some(Distribution::Jammy)]);
    }

    #[test]
    fn test_derived_vacuous_truth_is_configurable() {
        let results = PackageResults::new();
        assert!(PackageDerived::infer(&results, true).every_distribution_passing);
        assert!(!PackageDerived::infer(&results, false).every_distribution_passing);
    }

    #[test]
    fn test_snapshot_counts() {
        let ts = NaiveDateTime::parse_from_str("2024-01-08_00-00-00", "%Y-%m-%d_%H-%M-%S").unwrap();
        let mut packages = BTreeMap::new();

        let mut good = PackageResults::new();
        good.insert("jammy-pip".to_string(), outcome(true));
        packages.insert("pkgA".to_string(), good);

        let mut bad = PackageResults::new();
        bad.insert("jammy-pip".to_string(), outcome(false));
        packages.insert("pkgB".to_string(), bad);

        let snapshot = Snapshot::new(ts, "results.json".to_string(), packages, true);
        assert_eq!(snapshot.package_count(), 2);
        assert_eq!(snapshot.failing_package_count(), 1);
        assert_eq!(snapshot.distro_passing_count(), 1);
    }
}
