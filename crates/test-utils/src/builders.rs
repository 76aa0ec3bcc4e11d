#![allow(dead_code)]

use abiflow::input::AbinitInput;
use abiflow::yamlio::IrredPert;

/// Minimal ground-state SCF deck.
pub fn scf_input() -> AbinitInput {
    AbinitInput::new()
        .with_comment("ground state")
        .with("ecut", 4.0)
        .with("ngkpt", vec![2i64, 2, 2])
        .with("nband", 6i64)
        .with("tolvrs", 1e-8)
}

/// Minimal NSCF deck (many empty bands for GW).
pub fn nscf_input() -> AbinitInput {
    AbinitInput::new()
        .with_comment("nscf on dense mesh")
        .with("iscf", -2i64)
        .with("ecut", 4.0)
        .with("nband", 20i64)
        .with("tolwfr", 1e-12)
}

/// Minimal screening deck.
pub fn scr_input() -> AbinitInput {
    AbinitInput::new()
        .with_comment("screening")
        .with("optdriver", 3i64)
        .with("ecut", 4.0)
        .with("ecuteps", 2.0)
        .with("nband", 20i64)
}

/// Minimal self-energy deck.
pub fn sigma_input() -> AbinitInput {
    AbinitInput::new()
        .with_comment("self-energy")
        .with("optdriver", 4i64)
        .with("ecut", 4.0)
        .with("ecutsigx", 3.0)
        .with("nband", 20i64)
}

/// Minimal DFPT template deck.
pub fn phonon_template() -> AbinitInput {
    AbinitInput::new()
        .with_comment("dfpt perturbation")
        .with("ecut", 4.0)
        .with("tolvrs", 1e-8)
}

/// Render a probe log containing a `!Kpoints` document with the given
/// q-points, surrounded by solver chatter.
pub fn qpoints_log(qpts: &[[f64; 3]]) -> String {
    let rows: Vec<String> = qpts
        .iter()
        .map(|q| format!("[{}, {}, {}]", q[0], q[1], q[2]))
        .collect();

    format!(
        "solver banner\n\
         --- !Kpoints\n\
         reduced_coordinates_of_qpoints: [{}]\n\
         ...\n\
         normal exit\n",
        rows.join(", ")
    )
}

/// Render a probe log containing an `!IrredPerts` document.
pub fn irred_perts_log(perts: &[IrredPert]) -> String {
    let rows: Vec<String> = perts
        .iter()
        .map(|p| {
            format!(
                "  - {{idir: {}, ipert: {}, qpt: [{}, {}, {}]}}",
                p.idir, p.ipert, p.qpt[0], p.qpt[1], p.qpt[2]
            )
        })
        .collect();

    format!(
        "solver banner\n\
         --- !IrredPerts\n\
         irred_perts:\n{}\n\
         ...\n\
         normal exit\n",
        rows.join("\n")
    )
}
