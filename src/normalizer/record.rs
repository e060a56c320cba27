//! Reconstructed records: the raw-string accumulation form the engine
//! mutates, and the final typed form the exporters consume.

use serde::Serialize;

/// One (professor, subject-assignment) row while pages are being consumed.
/// All values stay raw strings so later continuation and totals rows can
/// patch them; `order` is the global appearance counter and the sole output
/// ordering key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailRecord {
    pub no_prof: String,
    pub profesor: String,
    pub categoria: String,
    pub clave_asig: String,
    pub asignatura: String,
    pub grupo_anterior: String,
    pub grupo_actual: String,
    pub sem_ant_teo: String,
    pub sem_ant_pra: String,
    pub sem_ant_total: String,
    pub sem_act_teo: String,
    pub sem_act_pra: String,
    pub sem_act_total: String,
    pub tot_tipo: String,
    pub tot_sem_ant_teo: String,
    pub tot_sem_ant_pra: String,
    pub tot_sem_ant_total: String,
    pub tot_sem_act_teo: String,
    pub tot_sem_act_pra: String,
    pub tot_sem_act_total: String,
    pub order: u64,
}

/// Final output row: appearance-ordered, metrics coerced to numbers, the
/// order counter dropped. Field order is the output column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalRecord {
    pub no_prof: String,
    pub profesor: String,
    pub categoria: String,
    pub clave_asig: String,
    pub asignatura: String,
    pub grupo_anterior: String,
    pub grupo_actual: String,
    pub sem_ant_teo: Option<f64>,
    pub sem_ant_pra: Option<f64>,
    pub sem_ant_total: Option<f64>,
    pub sem_act_teo: Option<f64>,
    pub sem_act_pra: Option<f64>,
    pub sem_act_total: Option<f64>,
    pub tot_tipo: String,
    #[serde(rename = "TOT_sem_ant_teo")]
    pub tot_sem_ant_teo: Option<f64>,
    #[serde(rename = "TOT_sem_ant_pra")]
    pub tot_sem_ant_pra: Option<f64>,
    #[serde(rename = "TOT_sem_ant_total")]
    pub tot_sem_ant_total: Option<f64>,
    #[serde(rename = "TOT_sem_act_teo")]
    pub tot_sem_act_teo: Option<f64>,
    #[serde(rename = "TOT_sem_act_pra")]
    pub tot_sem_act_pra: Option<f64>,
    #[serde(rename = "TOT_sem_act_total")]
    pub tot_sem_act_total: Option<f64>,
}

impl NormalRecord {
    /// Output column names, in order.
    pub const HEADERS: [&'static str; 20] = [
        "no_prof",
        "profesor",
        "categoria",
        "clave_asig",
        "asignatura",
        "grupo_anterior",
        "grupo_actual",
        "sem_ant_teo",
        "sem_ant_pra",
        "sem_ant_total",
        "sem_act_teo",
        "sem_act_pra",
        "sem_act_total",
        "tot_tipo",
        "TOT_sem_ant_teo",
        "TOT_sem_ant_pra",
        "TOT_sem_ant_total",
        "TOT_sem_act_teo",
        "TOT_sem_act_pra",
        "TOT_sem_act_total",
    ];
}

/// One output cell, for exporters that write columns positionally.
#[derive(Debug, Clone, Copy)]
pub enum Cell<'a> {
    Text(&'a str),
    Number(Option<f64>),
}

impl NormalRecord {
    /// The record's cells in output column order.
    pub fn cells(&self) -> [Cell<'_>; 20] {
        [
            Cell::Text(&self.no_prof),
            Cell::Text(&self.profesor),
            Cell::Text(&self.categoria),
            Cell::Text(&self.clave_asig),
            Cell::Text(&self.asignatura),
            Cell::Text(&self.grupo_anterior),
            Cell::Text(&self.grupo_actual),
            Cell::Number(self.sem_ant_teo),
            Cell::Number(self.sem_ant_pra),
            Cell::Number(self.sem_ant_total),
            Cell::Number(self.sem_act_teo),
            Cell::Number(self.sem_act_pra),
            Cell::Number(self.sem_act_total),
            Cell::Text(&self.tot_tipo),
            Cell::Number(self.tot_sem_ant_teo),
            Cell::Number(self.tot_sem_ant_pra),
            Cell::Number(self.tot_sem_ant_total),
            Cell::Number(self.tot_sem_act_teo),
            Cell::Number(self.tot_sem_act_pra),
            Cell::Number(self.tot_sem_act_total),
        ]
    }
}
