//! Per-UE link records for CSV persistence
//!
//! One [`LinkRecord`] is produced per UE per snapshot, stamped with the
//! gain/noise commanded at ingest time. The column set is fixed; metrics a
//! RAT does not report are left empty rather than zeroed so downstream
//! analysis can tell "absent" from "measured zero".

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt::Write as _;

use super::snapshot::{Rat, UeKey, UeReading};
use super::sweep::GainPair;

/// CSV column order. Every record writes all 25 columns.
pub const CSV_COLUMNS: [&str; 25] = [
    "timestamp",
    "ue_id",
    "RAT",
    "instant_rate_mbps",
    "avg_rate_mbps",
    "total_dl_bytes",
    "epre",
    "ul_path_loss",
    "p_ue",
    "ul_phr",
    "pucch1_snr",
    "pusch_snr",
    "cqi",
    "ri",
    "dl_mcs",
    "ul_mcs",
    "ul_n_layer",
    "ul_rank",
    "dl_retx",
    "ul_retx",
    "dl_err",
    "ul_err",
    "gain_4g",
    "gain_5g",
    "noise",
];

/// One fully-stamped telemetry row.
#[derive(Debug, Clone, Serialize)]
pub struct LinkRecord {
    pub timestamp: DateTime<Local>,
    pub ue: UeKey,
    /// Instantaneous DL rate from the serving cell's `dl_bitrate`, Mbps.
    pub instant_rate_mbps: f64,
    /// Windowed mean DL rate from the rate tracker, Mbps.
    pub avg_rate_mbps: f64,
    pub total_dl_bytes: u64,
    pub epre: Option<f64>,
    pub ul_path_loss: Option<f64>,
    pub p_ue: Option<f64>,
    pub ul_phr: Option<f64>,
    pub pucch1_snr: Option<f64>,
    pub pusch_snr: Option<f64>,
    pub cqi: Option<f64>,
    pub ri: Option<f64>,
    pub dl_mcs: Option<f64>,
    pub ul_mcs: Option<f64>,
    pub ul_n_layer: Option<f64>,
    pub ul_rank: Option<f64>,
    pub dl_retx: Option<f64>,
    pub ul_retx: Option<f64>,
    pub dl_err: Option<f64>,
    pub ul_err: Option<f64>,
    /// Commanded LTE-axis gain at ingest time (dB).
    pub gain_4g: f64,
    /// Commanded NR-axis gain at ingest time (dB).
    pub gain_5g: f64,
    /// Commanded noise level at ingest time (dB); empty until first set.
    pub noise: Option<f64>,
}

impl LinkRecord {
    /// Build a record from one extracted reading.
    ///
    /// Applies the per-RAT field mask: NR UEs never report `pucch1_snr`;
    /// LTE UEs never report `ul_phr`, `ri`, `ul_rank` or the retx/err
    /// counters.
    #[must_use]
    pub fn from_reading(
        reading: &UeReading,
        avg_rate_mbps: f64,
        timestamp: DateTime<Local>,
        gain: GainPair,
        noise: Option<f64>,
    ) -> Self {
        let cell = &reading.cell;
        let nr = reading.key.rat == Rat::Nr;
        let nr_only = |v: Option<f64>| if nr { v } else { None };
        let lte_only = |v: Option<f64>| if nr { None } else { v };

        Self {
            timestamp,
            ue: reading.key,
            instant_rate_mbps: cell.dl_bitrate / 1_000_000.0,
            avg_rate_mbps,
            total_dl_bytes: reading.total_dl_bytes,
            epre: cell.epre,
            ul_path_loss: cell.ul_path_loss,
            p_ue: cell.p_ue,
            ul_phr: nr_only(cell.ul_phr),
            pucch1_snr: lte_only(cell.pucch1_snr),
            pusch_snr: cell.pusch_snr,
            cqi: cell.cqi,
            ri: nr_only(cell.ri),
            dl_mcs: cell.dl_mcs,
            ul_mcs: cell.ul_mcs,
            ul_n_layer: cell.ul_n_layer,
            ul_rank: nr_only(cell.ul_rank),
            dl_retx: nr_only(cell.dl_retx),
            ul_retx: nr_only(cell.ul_retx),
            dl_err: nr_only(cell.dl_err),
            ul_err: nr_only(cell.ul_err),
            gain_4g: gain.lte,
            gain_5g: gain.nr,
            noise,
        }
    }

    /// Header line matching [`CSV_COLUMNS`].
    #[must_use]
    pub fn csv_header() -> String {
        CSV_COLUMNS.join(",")
    }

    /// One CSV row, columns in [`CSV_COLUMNS`] order, no trailing newline.
    /// Absent optional fields render as empty cells.
    #[must_use]
    pub fn csv_row(&self) -> String {
        fn opt(v: Option<f64>) -> String {
            v.map(|x| x.to_string()).unwrap_or_default()
        }

        let mut row = String::with_capacity(160);
        let _ = write!(
            row,
            "{},{},{},{},{},{}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.6f"),
            self.ue.id,
            self.ue.rat,
            self.instant_rate_mbps,
            self.avg_rate_mbps,
            self.total_dl_bytes,
        );
        for v in [
            self.epre,
            self.ul_path_loss,
            self.p_ue,
            self.ul_phr,
            self.pucch1_snr,
            self.pusch_snr,
            self.cqi,
            self.ri,
            self.dl_mcs,
            self.ul_mcs,
            self.ul_n_layer,
            self.ul_rank,
            self.dl_retx,
            self.ul_retx,
            self.dl_err,
            self.ul_err,
        ] {
            let _ = write!(row, ",{}", opt(v));
        }
        let _ = write!(row, ",{},{},{}", self.gain_4g, self.gain_5g, opt(self.noise));
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::snapshot::CellMetrics;

    fn reading(key: UeKey, bytes: u64, cell: CellMetrics) -> UeReading {
        UeReading {
            key,
            total_dl_bytes: bytes,
            cell,
        }
    }

    fn full_cell() -> CellMetrics {
        CellMetrics {
            dl_bitrate: 12_000_000.0,
            epre: Some(-88.0),
            ul_path_loss: Some(72.5),
            p_ue: Some(10.0),
            ul_phr: Some(30.0),
            pucch1_snr: Some(19.0),
            pusch_snr: Some(22.0),
            cqi: Some(13.0),
            ri: Some(2.0),
            dl_mcs: Some(25.0),
            ul_mcs: Some(20.0),
            ul_n_layer: Some(2.0),
            ul_rank: Some(2.0),
            dl_retx: Some(1.0),
            ul_retx: Some(0.0),
            dl_err: Some(0.0),
            ul_err: Some(0.0),
        }
    }

    #[test]
    fn header_has_25_columns_in_fixed_order() {
        let header = LinkRecord::csv_header();
        assert_eq!(header.split(',').count(), 25);
        assert!(header.starts_with("timestamp,ue_id,RAT,instant_rate_mbps"));
        assert!(header.ends_with("gain_4g,gain_5g,noise"));
    }

    #[test]
    fn nr_record_masks_pucch1_snr() {
        let rec = LinkRecord::from_reading(
            &reading(UeKey::nr(1), 1000, full_cell()),
            5.0,
            Local::now(),
            GainPair::new(80.0, 70.0),
            Some(-40.0),
        );
        assert_eq!(rec.pucch1_snr, None);
        assert_eq!(rec.ul_phr, Some(30.0));
        assert_eq!(rec.ri, Some(2.0));
        assert_eq!(rec.instant_rate_mbps, 12.0);
        assert_eq!(rec.gain_4g, 80.0);
        assert_eq!(rec.gain_5g, 70.0);
    }

    #[test]
    fn lte_record_masks_nr_only_fields() {
        let rec = LinkRecord::from_reading(
            &reading(UeKey::lte(3), 500, full_cell()),
            1.0,
            Local::now(),
            GainPair::uniform(60.0),
            None,
        );
        assert_eq!(rec.pucch1_snr, Some(19.0));
        assert_eq!(rec.ul_phr, None);
        assert_eq!(rec.ri, None);
        assert_eq!(rec.ul_rank, None);
        assert_eq!(rec.dl_retx, None);
        assert_eq!(rec.ul_err, None);
    }

    #[test]
    fn csv_row_renders_absent_fields_as_empty_cells() {
        let rec = LinkRecord::from_reading(
            &reading(UeKey::lte(3), 500, CellMetrics::default()),
            0.25,
            Local::now(),
            GainPair::uniform(0.0),
            None,
        );
        let row = rec.csv_row();
        assert_eq!(row.split(',').count(), 25);
        // No noise commanded yet: final cell is empty.
        assert!(row.ends_with(",0,0,"));
        assert!(row.contains(",LTE,"));
    }
}
