use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use revenue_forecast::aggregate::{MonthlyMacro, MonthlyRevenue, MonthlySeries};
use revenue_forecast::config::Horizon;
use revenue_forecast::forecast::ForecastEngine;
use revenue_forecast::reconcile::{reconcile, CombinedTimeline};
use revenue_forecast::utils::month_end;
use std::collections::BTreeSet;

fn month(m: u32) -> NaiveDate {
    month_end(NaiveDate::from_ymd_opt(2023, m, 1).unwrap())
}

fn create_series() -> MonthlySeries {
    let online = [100.0, 110.0, 120.0, 130.0, 140.0, 150.0];
    let retail = [40.0, 42.0, 41.0, 45.0];

    MonthlySeries::from_points(
        online
            .iter()
            .enumerate()
            .map(|(k, &revenue)| MonthlyRevenue {
                month: month(k as u32 + 1),
                category: "Online".to_string(),
                revenue,
            })
            .chain(retail.iter().enumerate().map(|(k, &revenue)| MonthlyRevenue {
                month: month(k as u32 + 2),
                category: "Retail".to_string(),
                revenue,
            })),
    )
}

fn create_macros() -> Vec<MonthlyMacro> {
    (1..=6)
        .map(|m| MonthlyMacro {
            month: month(m),
            exchange_rate: 1.0,
            inflation_rate: 2.0,
        })
        .collect()
}

#[test]
fn test_merge_is_commutative() {
    let series = create_series();
    let run = ForecastEngine::default().forecast(&series, &create_macros(), Horizon::new(3).unwrap());

    let actual_first = CombinedTimeline::from_actuals(&series).merge(CombinedTimeline::from_forecasts(&run));
    let forecast_first = CombinedTimeline::from_forecasts(&run).merge(CombinedTimeline::from_actuals(&series));

    assert_eq!(actual_first, forecast_first);
}

#[test]
fn test_one_row_per_month_and_category() {
    let series = create_series();
    let run = ForecastEngine::default().forecast(&series, &create_macros(), Horizon::new(3).unwrap());
    let timeline = reconcile(&series, &run);

    let keys: BTreeSet<(NaiveDate, String)> = timeline
        .rows()
        .iter()
        .map(|r| (r.month, r.category.clone()))
        .collect();
    assert_eq!(keys.len(), timeline.len());

    // Six months of Online history and four of Retail, each followed by three projections
    assert_eq!(timeline.category("Online").len(), 9);
    assert_eq!(timeline.category("Retail").len(), 7);
    assert!(timeline
        .rows()
        .windows(2)
        .all(|w| (w[0].month, &w[0].category) < (w[1].month, &w[1].category)));
}

#[test]
fn test_projected_rows_have_no_actual() {
    let series = create_series();
    let run = ForecastEngine::default().forecast(&series, &create_macros(), Horizon::new(1).unwrap());
    let timeline = reconcile(&series, &run);

    let retail = timeline.category("Retail");
    let last = retail.last().unwrap();
    assert_eq!(last.month, month(6));
    assert_eq!(last.actual, None);
    assert!(last.forecast.is_some());
    assert!(retail[..retail.len() - 1].iter().all(|r| r.actual.is_some() && r.forecast.is_some()));
}

#[test]
fn test_history_without_forecast_keeps_actuals() {
    let series = create_series();
    let timeline = CombinedTimeline::from_actuals(&series);

    assert_eq!(timeline.len(), series.len());
    assert!(timeline.rows().iter().all(|r| r.forecast.is_none() && r.lower.is_none()));
    assert_eq!(timeline.categories(), vec!["Online", "Retail"]);
}
