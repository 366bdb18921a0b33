use std::io::{self, Write};

use hma_post::{AnharmonicEstimator, Coordinates, EnergyUnit, Summary, Trajectory, Vec3};

use crate::util::text::truncate;

const INDENT: &str = "      ";

const BOX_INNER_WIDTH: usize = 62;
const SAFE_TABLE_WIDTH: usize = BOX_INNER_WIDTH - INDENT.len();

pub fn print_trajectory_info(trajectory: &Trajectory) {
    let stderr = io::stderr();
    let mut out = stderr.lock();

    let rows_cell = trajectory.cell.rows();
    let a = vec_len(&rows_cell[0]);
    let b = vec_len(&rows_cell[1]);
    let c = vec_len(&rows_cell[2]);
    let (alpha, beta, gamma) = calc_angles(rows_cell);

    let coords = match trajectory.coordinates {
        Coordinates::Direct => "direct (fractional)",
        Coordinates::Cartesian => "cartesian",
    };

    let rows = vec![
        ("Atoms", format!("{}", trajectory.num_atoms)),
        ("Recorded Steps", format!("{}", trajectory.steps())),
        ("Temperature (K)", format!("{:.1}", trajectory.temperature)),
        ("Timestep (fs)", format!("{:.2}", trajectory.timestep)),
        ("Volume (Å³/at)", format!("{:.4}", trajectory.volume_atom)),
        ("Cell (Å)", format!("{:.2} × {:.2} × {:.2}", a, b, c)),
        (
            "Angles (α β γ)",
            format!("{:.1}° {:.1}° {:.1}°", alpha, beta, gamma),
        ),
        ("Positions", coords.to_string()),
    ];

    print_kv_table(&mut out, "Trajectory Summary", &rows);
}

pub fn print_reference_info(estimator: &AnharmonicEstimator) {
    let stderr = io::stderr();
    let mut out = stderr.lock();

    let trajectory = estimator.trajectory();
    let rows = vec![
        (
            "E lat (eV/at)",
            format!("{:.5}", estimator.lattice_energy()),
        ),
        (
            "E harm (eV/at)",
            format!("{:.5}", estimator.harmonic_energy()),
        ),
        ("P lat (GPa)", format!("{:.5}", estimator.lattice_pressure())),
        (
            "P qh (GPa)",
            format!("{:.5}", estimator.options().pressure_qh),
        ),
        ("P ig (GPa)", format!("{:.5}", trajectory.pressure_ig())),
    ];

    print_kv_table(&mut out, "Harmonic Reference", &rows);
}

pub fn print_block_info(summary: &Summary, steps_eq: usize, blocksize: usize) {
    let stderr = io::stderr();
    let mut out = stderr.lock();

    let rows = vec![
        ("Equilibration", format!("{} steps", steps_eq)),
        ("Production", format!("{} steps", summary.production_steps)),
        ("Block Size", format!("{} steps", blocksize)),
        ("Blocks", format!("{}", summary.blocks)),
    ];

    print_kv_table(&mut out, "Block Averaging", &rows);
}

pub fn print_statistics(summary: &Summary, unit: EnergyUnit) {
    let stderr = io::stderr();
    let mut out = stderr.lock();

    let e_label = unit.label();
    let rows: Vec<(String, &hma_post::Stats)> = vec![
        (format!("e_ah_conv ({})", e_label), &summary.e_ah_conv),
        (format!("e_ah_hma ({})", e_label), &summary.e_ah_hma),
        ("p_ah_conv (GPa)".to_string(), &summary.p_ah_conv),
        ("p_ah_hma (GPa)".to_string(), &summary.p_ah_hma),
    ];

    let _ = writeln!(out, "{}┌─ Block Statistics ─┐", INDENT);
    let _ = writeln!(out, "{}┌──────────────────┬────────────┬───────────┬───────┐", INDENT);
    let _ = writeln!(out, "{}│ Observable       │    Average │     Error │   Cor │", INDENT);
    let _ = writeln!(out, "{}├──────────────────┼────────────┼───────────┼───────┤", INDENT);

    for (label, stats) in &rows {
        let _ = writeln!(
            out,
            "{}│ {:<16} │ {:>10.5} │ {:>9.1e} │ {:>5.2} │",
            INDENT,
            truncate(label, 16),
            stats.avg,
            stats.err,
            stats.cor
        );
    }

    let _ = writeln!(out, "{}└──────────────────┴────────────┴───────────┴───────┘", INDENT);
}

fn print_kv_table(out: &mut impl Write, title: &str, rows: &[(&str, String)]) {
    let key_w = 16usize;
    let sep_overhead = 6;
    let val_w = SAFE_TABLE_WIDTH.saturating_sub(key_w + sep_overhead);

    let _ = writeln!(
        out,
        "{}┌─ {} ─┐",
        INDENT,
        truncate(title, SAFE_TABLE_WIDTH - 6)
    );
    let _ = writeln!(
        out,
        "{}┌{k_line}┬{v_line}┐",
        INDENT,
        k_line = "─".repeat(key_w + 2),
        v_line = "─".repeat(val_w + 2)
    );
    let _ = writeln!(
        out,
        "{}│ {:<key_w$} │ {:>val_w$} │",
        INDENT,
        "Metric",
        "Value",
        key_w = key_w,
        val_w = val_w
    );
    let _ = writeln!(
        out,
        "{}├{k_line}┼{v_line}┤",
        INDENT,
        k_line = "─".repeat(key_w + 2),
        v_line = "─".repeat(val_w + 2)
    );

    for (key, val) in rows {
        let _ = writeln!(
            out,
            "{}│ {:<key_w$} │ {:>val_w$} │",
            INDENT,
            truncate(key, key_w),
            truncate(val, val_w),
            key_w = key_w,
            val_w = val_w
        );
    }

    let _ = writeln!(
        out,
        "{}└{k_line}┴{v_line}┘",
        INDENT,
        k_line = "─".repeat(key_w + 2),
        v_line = "─".repeat(val_w + 2)
    );
}

fn vec_len(v: &Vec3) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

fn calc_angles(rows: &[Vec3; 3]) -> (f64, f64, f64) {
    let a = &rows[0];
    let b = &rows[1];
    let c = &rows[2];

    let len_a = vec_len(a);
    let len_b = vec_len(b);
    let len_c = vec_len(c);

    let alpha = ((b[0] * c[0] + b[1] * c[1] + b[2] * c[2]) / (len_b * len_c))
        .acos()
        .to_degrees();
    let beta = ((a[0] * c[0] + a[1] * c[1] + a[2] * c[2]) / (len_a * len_c))
        .acos()
        .to_degrees();
    let gamma = ((a[0] * b[0] + a[1] * b[1] + a[2] * b[2]) / (len_a * len_b))
        .acos()
        .to_degrees();

    (alpha, beta, gamma)
}
