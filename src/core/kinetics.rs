//! Michaelis–Menten analysis of enzyme initial rates.
//!
//! Slopes (absorbance per minute) are converted to rates in µM/s with the
//! substrate's extinction coefficient, then `v = Vmax·S / (Km + S)` is fitted
//! by Levenberg–Marquardt least squares.

use crate::domain::model::Value;
use crate::domain::table::Table;
use crate::utils::error::{DknError, Result};
use nalgebra::{Matrix2, Vector2};
use serde::Serialize;

pub const RATE_COLUMN: &str = "Vmax_(uM_s-1)";

const PER_MIN_TO_PER_SEC: f64 = 1.0 / 60.0;
const M_TO_UM: f64 = 1_000_000.0;

const MAX_ITERATIONS: usize = 500;
const MAX_DAMPING: f64 = 1e16;

#[derive(Debug, Clone, PartialEq)]
pub struct KineticsParams {
    /// Extinction coefficient of the substrate in M⁻¹ cm⁻¹
    pub ex_coeff: f64,
    pub substrate_column: String,
    pub slope_column: String,
    /// Enzyme concentration in µM
    pub protein_concentration: f64,
    pub protein_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MichaelisMentenFit {
    pub vmax: f64,
    pub km: f64,
    pub vmax_stdev: f64,
    pub km_stdev: f64,
    pub sum_squared_residuals: f64,
    pub iterations: usize,
}

impl MichaelisMentenFit {
    pub fn predict(&self, substrate: f64) -> f64 {
        michaelis_menten(substrate, self.vmax, self.km)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KineticsResult {
    pub protein_name: String,
    pub fit: MichaelisMentenFit,
    /// s⁻¹
    pub kcat: f64,
    /// s⁻¹ M⁻¹
    pub catalytic_efficiency: f64,
    pub n_points: usize,
    pub label: String,
}

pub fn michaelis_menten(substrate: f64, vmax: f64, km: f64) -> f64 {
    vmax * substrate / (km + substrate)
}

/// 由斜率計算初速 (µM/s) 並新增為一欄
pub fn compute_rates(table: &Table, params: &KineticsParams) -> Result<Table> {
    let rates = table
        .column(&params.slope_column)?
        .map(|slope| match slope.as_f64() {
            Some(s) => Value::from(s * M_TO_UM * PER_MIN_TO_PER_SEC / params.ex_coeff),
            None => Value::Missing,
        })
        .collect();

    let mut out = table.clone();
    out.with_column(RATE_COLUMN, rates)?;
    Ok(out)
}

/// 取出成對的 (受質濃度, 速率)，略過缺值
pub fn fit_points(table: &Table, substrate_column: &str) -> Result<(Vec<f64>, Vec<f64>)> {
    let substrate: Vec<Option<f64>> = table.column(substrate_column)?.map(Value::as_f64).collect();
    let rates: Vec<Option<f64>> = table.column(RATE_COLUMN)?.map(Value::as_f64).collect();

    Ok(substrate
        .into_iter()
        .zip(rates)
        .filter_map(|(s, v)| match (s, v) {
            (Some(s), Some(v)) if s.is_finite() && v.is_finite() => Some((s, v)),
            _ => None,
        })
        .unzip())
}

fn sum_squared_residuals(x: &[f64], y: &[f64], p: &Vector2<f64>) -> f64 {
    x.iter()
        .zip(y)
        .map(|(&s, &v)| {
            let r = v - michaelis_menten(s, p[0], p[1]);
            r * r
        })
        .sum()
}

/// JᵀJ and Jᵀr for the model at `p`.
fn normal_equations(x: &[f64], y: &[f64], p: &Vector2<f64>) -> (Matrix2<f64>, Vector2<f64>) {
    let (vmax, km) = (p[0], p[1]);
    let mut jtj = Matrix2::zeros();
    let mut jtr = Vector2::zeros();

    for (&s, &v) in x.iter().zip(y) {
        let denom = km + s;
        let grad = Vector2::new(s / denom, -vmax * s / (denom * denom));
        let residual = v - vmax * s / denom;
        jtj += grad * grad.transpose();
        jtr += grad * residual;
    }
    (jtj, jtr)
}

/// 以資料估計初始值：Vmax 取最大速率，Km 取接近半最大速率的濃度
fn initial_guess(x: &[f64], y: &[f64]) -> Vector2<f64> {
    let vmax = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let half = vmax / 2.0;

    let km = x
        .iter()
        .zip(y)
        .filter(|&(&s, _)| s > 0.0)
        .min_by(|a, b| (a.1 - half).abs().total_cmp(&(b.1 - half).abs()))
        .map(|(&s, _)| s)
        .unwrap_or(1.0);

    Vector2::new(vmax, km)
}

pub fn fit_michaelis_menten(x: &[f64], y: &[f64]) -> Result<MichaelisMentenFit> {
    if x.len() != y.len() {
        return Err(DknError::FitError {
            message: format!("{} concentrations but {} rates", x.len(), y.len()),
        });
    }
    if x.len() < 3 {
        return Err(DknError::FitError {
            message: format!(
                "At least 3 data points are needed to fit Vmax and Km with uncertainties, got {}",
                x.len()
            ),
        });
    }
    if !x.iter().any(|&s| s > 0.0) {
        return Err(DknError::FitError {
            message: "Substrate concentrations must include positive values".to_string(),
        });
    }

    let mut p = initial_guess(x, y);
    let mut ssr = sum_squared_residuals(x, y, &p);
    if !ssr.is_finite() {
        return Err(DknError::FitError {
            message: "Initial estimate produced non-finite residuals".to_string(),
        });
    }

    let mut damping = 1e-3;
    let mut iterations = 0;

    while iterations < MAX_ITERATIONS {
        iterations += 1;
        let (jtj, jtr) = normal_equations(x, y, &p);

        let mut augmented = jtj;
        augmented[(0, 0)] *= 1.0 + damping;
        augmented[(1, 1)] *= 1.0 + damping;

        let Some(step) = augmented.lu().solve(&jtr) else {
            damping *= 10.0;
            if damping > MAX_DAMPING {
                break;
            }
            continue;
        };

        let candidate = p + step;
        let candidate_ssr = sum_squared_residuals(x, y, &candidate);

        if candidate_ssr.is_finite() && candidate_ssr <= ssr {
            let improvement = ssr - candidate_ssr;
            let small_step = step.norm() <= 1e-12 * (p.norm() + 1e-12);
            p = candidate;
            ssr = candidate_ssr;
            damping = (damping / 10.0).max(1e-12);
            if small_step || improvement <= 1e-15 * ssr.max(f64::MIN_POSITIVE) {
                break;
            }
        } else {
            // 無法再降低殘差，視為已收斂
            damping *= 10.0;
            if damping > MAX_DAMPING {
                break;
            }
        }
    }

    if !(p[0].is_finite() && p[1].is_finite()) {
        return Err(DknError::FitError {
            message: "Fit diverged".to_string(),
        });
    }

    let (jtj, _) = normal_equations(x, y, &p);
    let covariance = jtj.try_inverse().ok_or_else(|| DknError::FitError {
        message: "Covariance of the parameters could not be estimated (singular Jacobian)"
            .to_string(),
    })? * (ssr / (x.len() - 2) as f64);

    tracing::debug!(
        "Michaelis-Menten fit converged after {} iterations: Vmax={}, Km={}",
        iterations,
        p[0],
        p[1]
    );

    Ok(MichaelisMentenFit {
        vmax: p[0],
        km: p[1],
        vmax_stdev: covariance[(0, 0)].abs().sqrt(),
        km_stdev: covariance[(1, 1)].abs().sqrt(),
        sum_squared_residuals: ssr,
        iterations,
    })
}

/// 兩位小數的科學記號，指數帶正負號且至少兩位 (4.00e+00)
fn sci(value: f64) -> String {
    let formatted = format!("{:.2e}", value);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exp) => format!("{}e{:+03}", mantissa, exp),
            Err(_) => formatted,
        },
        None => formatted,
    }
}

pub fn kinetics_label(km: f64, kcat: f64, catalytic_efficiency: f64) -> String {
    format!(
        "Km = {:.2} µM, kcat = {} s-1, catalytic efficiency = {} s-1 M-1",
        km,
        sci(kcat),
        sci(catalytic_efficiency)
    )
}

/// 計算速率、擬合並導出 kcat 與催化效率
pub fn analyze(table: &Table, params: &KineticsParams) -> Result<(Table, KineticsResult)> {
    let rates = compute_rates(table, params)?;
    let (x, y) = fit_points(&rates, &params.substrate_column)?;
    let fit = fit_michaelis_menten(&x, &y)?;

    let kcat = fit.vmax / params.protein_concentration;
    let catalytic_efficiency = kcat / fit.km * M_TO_UM;

    let result = KineticsResult {
        protein_name: params.protein_name.clone(),
        fit,
        kcat,
        catalytic_efficiency,
        n_points: x.len(),
        label: kinetics_label(fit.km, kcat, catalytic_efficiency),
    };
    Ok((rates, result))
}
