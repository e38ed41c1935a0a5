//! Built-in scenario suite run by `statjoin -test`.
//!
//! Scenarios report on stdout so the suite doubles as a smoke test of an
//! installed binary.

use tracing::warn;

use crate::dump::{load_dump, store_dump};
use crate::join::join;
use crate::order::sort_by_cost;
use crate::record::Record;

const COST_EPSILON: f32 = 0.01;

/// Outcome of [`run_self_tests`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SuiteReport {
    pub passed: usize,
    pub total: usize,
}

impl SuiteReport {
    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }
}

struct JoinScenario {
    name: &'static str,
    a: Vec<Record>,
    b: Vec<Record>,
    expected: Vec<Record>,
    sort: bool,
}

fn scenarios() -> Vec<JoinScenario> {
    let single = vec![Record::new(1, 1, 1.0, true, 1)];
    vec![
        JoinScenario {
            name: "Basic",
            a: vec![
                Record::new(90889, 13, 3.567, false, 3),
                Record::new(90089, 1, 88.90, true, 0),
            ],
            b: vec![
                Record::new(90089, 13, 0.011, false, 2),
                Record::new(90189, 1000, 1.00003, true, 2),
            ],
            expected: vec![
                Record::new(90189, 1000, 1.00003, true, 2),
                Record::new(90889, 13, 3.567, false, 3),
                Record::new(90089, 14, 88.911, false, 2),
            ],
            sort: true,
        },
        JoinScenario {
            name: "Empty arrays",
            a: vec![],
            b: vec![],
            expected: vec![],
            sort: false,
        },
        JoinScenario {
            name: "Empty first",
            a: vec![],
            b: single.clone(),
            expected: single.clone(),
            sort: false,
        },
        JoinScenario {
            name: "Empty second",
            a: single.clone(),
            b: vec![],
            expected: single,
            sort: false,
        },
        JoinScenario {
            name: "Multiple duplicates",
            a: vec![
                Record::new(1, 1, 1.0, true, 1),
                Record::new(1, 2, 2.0, false, 2),
                Record::new(1, 3, 3.0, true, 3),
            ],
            b: vec![],
            expected: vec![Record::new(1, 6, 6.0, false, 3)],
            sort: false,
        },
    ]
}

fn debug_line(r: &Record) -> String {
    format!(
        "id={}, count={}, cost={:.5}, primary={}, mode={}",
        r.id, r.count, r.cost, r.primary as u8, r.mode()
    )
}

fn run_join_scenario(scenario: &JoinScenario) -> bool {
    let name = scenario.name;
    println!("Running test: {name}");

    let mut result = match join(&scenario.a, &scenario.b) {
        Ok(result) => result,
        Err(e) => {
            println!("Test {name} failed: join returned an error: {e}");
            return false;
        }
    };

    if result.len() != scenario.expected.len() {
        println!(
            "Test {name} failed: expected {} records, got {}",
            scenario.expected.len(),
            result.len()
        );
        return false;
    }

    if scenario.sort {
        sort_by_cost(&mut result);
    }

    let mut passed = true;
    for (i, (got, expected)) in result.iter().zip(&scenario.expected).enumerate() {
        if !got.approx_eq(expected, COST_EPSILON) {
            println!("Test {name} failed at record {i}:");
            println!("Expected: {}", debug_line(expected));
            println!("Got:      {}", debug_line(got));
            passed = false;
        }
    }

    if passed {
        println!("Test {name} passed");
    }
    passed
}

fn run_store_load() -> bool {
    println!("Testing store/load...");

    let data = [
        Record::new(123, 456, 7.89, true, 5),
        Record::new(987, 654, 3.21, false, 2),
    ];

    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            warn!(%e, "could not create a scratch directory");
            println!("store/load failed: no scratch directory: {e}");
            return false;
        }
    };
    let path = dir.path().join("test_file.bin");

    if let Err(e) = store_dump(&path, &data) {
        println!("store failed: {e}");
        return false;
    }

    let loaded = match load_dump(&path) {
        Ok(loaded) => loaded,
        Err(e) => {
            println!("load failed: {e}");
            return false;
        }
    };

    if loaded.len() != data.len() {
        println!("load returned wrong size: {}", loaded.len());
        return false;
    }

    let mut passed = true;
    for (i, (got, expected)) in loaded.iter().zip(&data).enumerate() {
        if !got.approx_eq(expected, COST_EPSILON) {
            println!("Data mismatch at index {i}");
            passed = false;
        }
    }

    if passed {
        println!("store/load test passed");
    }
    passed
}

/// Runs every scenario and prints a summary line.
pub fn run_self_tests() -> SuiteReport {
    println!("Running all tests...");

    let mut report = SuiteReport {
        passed: 0,
        total: 0,
    };
    for scenario in scenarios() {
        report.total += 1;
        report.passed += run_join_scenario(&scenario) as usize;
    }
    report.total += 1;
    report.passed += run_store_load() as usize;

    println!("\nTest results: {}/{} passed", report.passed, report.total);
    report
}
