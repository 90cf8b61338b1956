use chrono::{Duration, NaiveDate};
use pretty_assertions::assert_eq;
use revenue_forecast::aggregate::{MonthlyRevenue, MonthlySeries};
use revenue_forecast::config::EvaluationConfig;
use revenue_forecast::evaluate::{generate_cutoffs, EvaluationWindows, Evaluator};
use revenue_forecast::pipeline::Stage;
use revenue_forecast::utils::add_months;
use rstest::rstest;
use std::collections::BTreeSet;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Month ends of 2023 at the given month numbers, with a noisy upward trend
fn create_points(category: &str, months: &[u32]) -> Vec<MonthlyRevenue> {
    months
        .iter()
        .map(|&m| MonthlyRevenue {
            month: add_months(d(2022, 12, 31), m),
            category: category.to_string(),
            revenue: 100.0 + 5.0 * m as f64 + ((m * 7) % 5) as f64,
        })
        .collect()
}

fn sequential() -> Evaluator {
    Evaluator::new(EvaluationConfig {
        parallel: false,
        ..EvaluationConfig::default()
    })
    .unwrap()
}

#[test]
fn test_short_category_fails_while_others_are_evaluated() {
    let all_months: Vec<u32> = (1..=12).collect();
    let mut points = create_points("Online", &all_months);
    points.extend(create_points("Retail", &all_months));
    points.extend(create_points("Pilot", &[11, 12]));

    let run = sequential().evaluate(&MonthlySeries::from_points(points));

    let evaluated: BTreeSet<&str> = run.performance.records().iter().map(|r| r.category.as_str()).collect();
    assert_eq!(evaluated, BTreeSet::from(["Online", "Retail"]));
    assert_eq!(run.cv.keys().collect::<Vec<_>>(), vec!["Online", "Retail"]);

    assert_eq!(run.failures.len(), 1);
    assert_eq!(run.failures[0].category, "Pilot");
    assert_eq!(run.failures[0].stage, Stage::Evaluation);
}

#[test]
fn test_every_successful_category_is_stacked() {
    let all_months: Vec<u32> = (1..=12).collect();
    let names = ["A", "B", "C", "D"];
    let points: Vec<MonthlyRevenue> = names
        .iter()
        .flat_map(|name| create_points(name, &all_months))
        .collect();

    let run = sequential().evaluate(&MonthlySeries::from_points(points));

    for name in names {
        assert!(!run.performance.category(name).is_empty(), "missing {}", name);
    }
    assert!(run.failures.is_empty());
}

#[test]
fn test_irregular_cadence_uses_day_windows() {
    let regular: Vec<u32> = (1..=12).collect();
    let irregular = [1, 2, 3, 7, 8, 9, 10, 11, 12];
    let mut points = create_points("Regular", &regular);
    points.extend(create_points("Gappy", &irregular));

    let run = sequential().evaluate(&MonthlySeries::from_points(points));

    // Same first and last month, so the same day-based cutoffs despite fewer rows
    let cutoffs = |category: &str| -> Vec<NaiveDate> {
        run.cv[category]
            .iter()
            .map(|p| p.cutoff)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    };
    assert_eq!(cutoffs("Regular"), vec![d(2023, 8, 21), d(2023, 10, 26)]);
    assert_eq!(cutoffs("Gappy"), cutoffs("Regular"));

    let horizons: BTreeSet<i64> = run
        .performance
        .category("Gappy")
        .iter()
        .map(|r| r.horizon_days)
        .collect();
    assert_eq!(horizons, BTreeSet::from([5, 10, 35, 40, 66]));
}

#[rstest]
#[case(d(2023, 12, 31), 66)]
#[case(d(2024, 12, 31), 138)]
#[case(d(2025, 6, 30), 174)]
fn test_windows_follow_each_history_span(#[case] last: NaiveDate, #[case] horizon_days: i64) {
    let windows = EvaluationWindows::for_span(d(2023, 1, 31), last, &EvaluationConfig::default());
    assert_eq!(windows.horizon, Duration::days(horizon_days));
    assert_eq!(windows.period, windows.horizon);
}

#[test]
fn test_history_shorter_than_horizon_fails() {
    let months = vec![d(2023, 1, 31), d(2023, 2, 28)];
    let windows = EvaluationWindows {
        initial: Duration::days(10),
        horizon: Duration::days(60),
        period: Duration::days(10),
    };
    let err = generate_cutoffs(&months, &windows).unwrap_err();
    assert!(err.to_string().contains("shorter than the evaluation horizon"));
}

#[test]
fn test_metrics_are_consistent() {
    let all_months: Vec<u32> = (1..=12).collect();
    let run = sequential().evaluate(&MonthlySeries::from_points(create_points("Online", &all_months)));

    for record in run.performance.records() {
        assert!((record.rmse - record.mse.sqrt()).abs() < 1e-9);
        assert!(record.mae <= record.rmse + 1e-9);
        assert!((0.0..=1.0).contains(&record.coverage));
        assert!(record.mape.is_some());
        assert_eq!(record.observations, 1);
    }

    let df = run.performance.to_dataframe().unwrap();
    assert_eq!(df.height(), run.performance.len());
    assert!(df.get_column_names().contains(&"Revenue Stream"));
}
