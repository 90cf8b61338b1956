use approx::assert_relative_eq;
use forecast_math::{mean, median, MathError, RidgeRegression, Standardization};
use rstest::rstest;

#[test]
fn test_ols_recovers_exact_line() {
    // y = 3 + 2x, no penalty
    let xs = [0.0, 1.0, 2.0, 3.0, 4.0];
    let design: Vec<Vec<f64>> = xs.iter().map(|&x| vec![1.0, x]).collect();
    let target: Vec<f64> = xs.iter().map(|&x| 3.0 + 2.0 * x).collect();

    let fit = RidgeRegression::new(vec![0.0, 0.0])
        .unwrap()
        .fit(&design, &target)
        .unwrap();

    assert_relative_eq!(fit.coefficients[0], 3.0, epsilon = 1e-9);
    assert_relative_eq!(fit.coefficients[1], 2.0, epsilon = 1e-9);
    assert!(fit.ssr < 1e-18);
    assert_relative_eq!(fit.predict_row(&[1.0, 10.0]).unwrap(), 23.0, epsilon = 1e-9);
}

#[test]
fn test_penalty_shrinks_slope() {
    let design: Vec<Vec<f64>> = (0..4).map(|x| vec![1.0, x as f64]).collect();
    let target = [0.0, 1.0, 2.0, 3.0];

    let free = RidgeRegression::new(vec![0.0, 0.0]).unwrap().fit(&design, &target).unwrap();
    let shrunk = RidgeRegression::new(vec![0.0, 5.0]).unwrap().fit(&design, &target).unwrap();

    assert!(shrunk.coefficients[1].abs() < free.coefficients[1].abs());
}

#[rstest]
#[case(vec![], vec![], true)]
#[case(vec![vec![1.0]], vec![1.0, 2.0], true)]
#[case(vec![vec![1.0, 2.0]], vec![1.0], true)]
fn test_invalid_shapes_are_rejected(
    #[case] design: Vec<Vec<f64>>,
    #[case] target: Vec<f64>,
    #[case] expect_err: bool,
) {
    let result = RidgeRegression::new(vec![0.0]).unwrap().fit(&design, &target);
    assert_eq!(result.is_err(), expect_err);
}

#[test]
fn test_negative_penalty_is_invalid() {
    assert!(matches!(
        RidgeRegression::new(vec![0.0, -1.0]),
        Err(MathError::InvalidInput(_))
    ));
}

#[test]
fn test_standardization_round_trip_values() {
    let s = Standardization::fit(&[1.0, 2.0, 3.0]).unwrap();
    assert_relative_eq!(s.center, 2.0);
    assert_relative_eq!(s.scale, 1.0);
    assert_relative_eq!(s.apply(4.0), 2.0);
    assert_eq!(Standardization::identity().apply(7.5), 7.5);
}

#[test]
fn test_summary_statistics() {
    assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
    assert_eq!(median(&[5.0, 1.0]), Some(3.0));
    assert_eq!(mean(&[]), None);
}
