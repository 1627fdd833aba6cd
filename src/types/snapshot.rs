//! UE telemetry snapshot wire model
//!
//! Serde model of the JSON snapshots pushed by the RAN stats endpoint in
//! response to `ue_get` requests. A snapshot carries a `ue_list`; each entry
//! is either an NR UE (keyed by `ran_ue_id`, downlink bytes summed over
//! `qos_flow_list`) or an LTE UE (keyed by `enb_ue_id`, downlink bytes taken
//! from the first ERAB reporting traffic). Entries with neither id field are
//! ignored. Link-quality metrics ride on the first entry of `cells`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Radio access technology of a tracked UE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rat {
    Nr,
    Lte,
}

impl Rat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nr => "NR",
            Self::Lte => "LTE",
        }
    }
}

impl fmt::Display for Rat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique key for a tracked UE.
///
/// NR and LTE id spaces are assigned independently by the stack, so the RAT
/// is part of the key; an NR UE 1 and an LTE UE 1 are different entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UeKey {
    pub rat: Rat,
    pub id: u64,
}

impl UeKey {
    #[must_use]
    pub const fn nr(id: u64) -> Self {
        Self { rat: Rat::Nr, id }
    }

    #[must_use]
    pub const fn lte(id: u64) -> Self {
        Self { rat: Rat::Lte, id }
    }
}

impl fmt::Display for UeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} UE[{}]", self.rat, self.id)
    }
}

/// One telemetry snapshot as received from the stats endpoint.
///
/// Messages without a `ue_list` (acks, unrelated notifications) deserialize
/// to an empty list and extract zero readings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UeSnapshot {
    #[serde(default)]
    pub ue_list: Vec<UeEntry>,
}

/// One UE entry inside a snapshot's `ue_list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UeEntry {
    /// NR identity (gNB-assigned). Present only for 5G UEs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ran_ue_id: Option<u64>,
    /// LTE identity (eNB-assigned). Present only for 4G UEs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enb_ue_id: Option<u64>,
    /// Per-cell link metrics; the first entry is the serving cell.
    #[serde(default)]
    pub cells: Vec<CellMetrics>,
    /// NR QoS flows; cumulative DL bytes are summed across all of them.
    #[serde(default)]
    pub qos_flow_list: Vec<QosFlow>,
    /// LTE ERABs; cumulative DL bytes come from the first one with traffic.
    #[serde(default)]
    pub erab_list: Vec<ErabSession>,
}

/// A single NR QoS flow counter set.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QosFlow {
    #[serde(default)]
    pub dl_total_bytes: u64,
}

/// A single LTE ERAB counter set.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ErabSession {
    #[serde(default)]
    pub dl_total_bytes: u64,
}

/// Serving-cell link metrics. All fields are reported by the stack only when
/// applicable, hence the blanket `Option`s.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CellMetrics {
    /// Instantaneous DL bitrate (bits/s).
    #[serde(default)]
    pub dl_bitrate: f64,
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
}

/// Counters and serving-cell metrics extracted for one UE from one snapshot.
#[derive(Debug, Clone)]
pub struct UeReading {
    pub key: UeKey,
    /// Cumulative downlink bytes since UE attach.
    pub total_dl_bytes: u64,
    /// Serving-cell metrics, defaulted when the entry carried no cells.
    pub cell: CellMetrics,
}

impl UeSnapshot {
    /// Extract a reading for every recognized UE, in snapshot order.
    ///
    /// Entries that carry neither `ran_ue_id` nor `enb_ue_id` are skipped.
    #[must_use]
    pub fn readings(&self) -> Vec<UeReading> {
        self.ue_list.iter().filter_map(UeEntry::reading).collect()
    }
}

impl UeEntry {
    fn reading(&self) -> Option<UeReading> {
        let (key, total_dl_bytes) = if let Some(id) = self.ran_ue_id {
            let total = self.qos_flow_list.iter().map(|q| q.dl_total_bytes).sum();
            (UeKey::nr(id), total)
        } else if let Some(id) = self.enb_ue_id {
            // First ERAB that has actually moved traffic; an idle bearer at
            // position 0 must not mask an active one behind it.
            let total = self
                .erab_list
                .iter()
                .map(|e| e.dl_total_bytes)
                .find(|b| *b > 0)
                .unwrap_or(0);
            (UeKey::lte(id), total)
        } else {
            return None;
        };

        let cell = self.cells.first().cloned().unwrap_or_default();
        Some(UeReading {
            key,
            total_dl_bytes,
            cell,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> UeSnapshot {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn nr_ue_sums_all_qos_flows() {
        let snap = parse(
            r#"{"ue_list": [{"ran_ue_id": 7,
                "qos_flow_list": [{"dl_total_bytes": 1000}, {"dl_total_bytes": 500}],
                "cells": [{"dl_bitrate": 8000000.0, "epre": -85.5, "cqi": 12}]}]}"#,
        );
        let readings = snap.readings();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].key, UeKey::nr(7));
        assert_eq!(readings[0].total_dl_bytes, 1500);
        assert_eq!(readings[0].cell.cqi, Some(12.0));
    }

    #[test]
    fn lte_ue_takes_first_active_erab() {
        let snap = parse(
            r#"{"ue_list": [{"enb_ue_id": 3,
                "erab_list": [{"dl_total_bytes": 0}, {"dl_total_bytes": 4200}, {"dl_total_bytes": 99}],
                "cells": [{"pucch1_snr": 18.0}]}]}"#,
        );
        let readings = snap.readings();
        assert_eq!(readings[0].key, UeKey::lte(3));
        assert_eq!(readings[0].total_dl_bytes, 4200);
    }

    #[test]
    fn lte_ue_with_only_idle_erabs_reads_zero() {
        let snap = parse(
            r#"{"ue_list": [{"enb_ue_id": 1, "erab_list": [{"dl_total_bytes": 0}]}]}"#,
        );
        assert_eq!(snap.readings()[0].total_dl_bytes, 0);
    }

    #[test]
    fn unrecognized_entries_are_skipped() {
        let snap = parse(r#"{"ue_list": [{"amf_ue_id": 9}, {"ran_ue_id": 1}]}"#);
        let readings = snap.readings();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].key, UeKey::nr(1));
    }

    #[test]
    fn message_without_ue_list_is_empty() {
        let snap = parse(r#"{"message": "ue_get", "message_id": "linksweep"}"#);
        assert!(snap.readings().is_empty());
    }

    #[test]
    fn missing_cells_default_to_empty_metrics() {
        let snap = parse(r#"{"ue_list": [{"ran_ue_id": 2}]}"#);
        let readings = snap.readings();
        assert_eq!(readings[0].cell.dl_bitrate, 0.0);
        assert_eq!(readings[0].cell.epre, None);
    }

    #[test]
    fn nr_and_lte_ids_are_distinct_keys() {
        assert_ne!(UeKey::nr(1), UeKey::lte(1));
        assert_eq!(UeKey::nr(1).to_string(), "NR UE[1]");
    }
}
