//! Continuous-time RC network of a building
//!
//! Every node balances heat flows in kW with a capacitance in kWh/K, so time is in
//! hours:
//!
//! ```text
//! C_zone · dT_zone/dt = Σ H·(T_neighbour - T_zone) + H_inf·(T_amb - T_zone)
//!                       + τ·A·I_window + q_internal + Q_heat - Q_cool
//! C_surf · dT_surf/dt = Σ 2UA·(T_side - T_surf) + α·A·I_outer
//! dE_storage/dt       = -E/τ_sd + η_c·Q_charge - Q_discharge/η_d
//! ```
//!
//! Massive surfaces split their resistance evenly between both faces (2UA per side).

use nalgebra::DMatrix;

use crate::domain::{StorageTypeRecord, SurfaceRecord, SurfaceType, ZoneRecord};

pub const AIR_DENSITY_KG_PER_M3: f64 = 1.204;
pub const AIR_SPECIFIC_HEAT_J_PER_KGK: f64 = 1006.0;
pub const JOULE_PER_KWH: f64 = 3.6e6;
pub const WATT_PER_KW: f64 = 1000.0;

/// Zone air node capacitance (kWh/K)
pub fn zone_capacitance_kwh_per_k(zone: &ZoneRecord) -> f64 {
    (AIR_DENSITY_KG_PER_M3 * AIR_SPECIFIC_HEAT_J_PER_KGK * zone.volume_m3()
        + zone.extra_heat_capacity_j_per_k)
        / JOULE_PER_KWH
}

/// Infiltration conductance (kW/K)
pub fn infiltration_conductance_kw_per_k(zone: &ZoneRecord) -> f64 {
    AIR_DENSITY_KG_PER_M3 * AIR_SPECIFIC_HEAT_J_PER_KGK * zone.volume_m3() * zone.infiltration_ach
        / 3600.0
        / WATT_PER_KW
}

/// Surface node capacitance (kWh/K)
pub fn surface_capacitance_kwh_per_k(surface: &SurfaceRecord) -> f64 {
    surface.heat_capacity_j_per_m2k * surface.area_m2 / JOULE_PER_KWH
}

/// Heat-flow form of the network; rows are divided by the node capacitances in
/// [`ThermalNetwork::into_continuous`].
pub struct ThermalNetwork {
    flows_state: DMatrix<f64>,
    flows_control: DMatrix<f64>,
    flows_disturbance: DMatrix<f64>,
    capacitance: Vec<f64>,
}

impl ThermalNetwork {
    pub fn new(n_states: usize, n_controls: usize, n_disturbances: usize) -> Self {
        Self {
            flows_state: DMatrix::zeros(n_states, n_states),
            flows_control: DMatrix::zeros(n_states, n_controls),
            flows_disturbance: DMatrix::zeros(n_states, n_disturbances),
            capacitance: vec![1.0; n_states],
        }
    }

    pub fn set_capacitance(&mut self, node: usize, kwh_per_k: f64) {
        self.capacitance[node] = kwh_per_k;
    }

    /// Conductance between two state nodes (kW/K)
    pub fn connect(&mut self, i: usize, j: usize, h: f64) {
        self.flows_state[(i, i)] -= h;
        self.flows_state[(i, j)] += h;
        self.flows_state[(j, j)] -= h;
        self.flows_state[(j, i)] += h;
    }

    /// Conductance between a state node and a temperature disturbance (kW/K)
    pub fn connect_boundary(&mut self, node: usize, disturbance: usize, h: f64) {
        self.flows_state[(node, node)] -= h;
        self.flows_disturbance[(node, disturbance)] += h;
    }

    /// Heat flow into `node` per unit of a disturbance (kW per unit)
    pub fn add_disturbance_gain(&mut self, node: usize, disturbance: usize, gain: f64) {
        self.flows_disturbance[(node, disturbance)] += gain;
    }

    /// Heat flow into `node` per unit of a control (kW per kW)
    pub fn add_control_gain(&mut self, node: usize, control: usize, gain: f64) {
        self.flows_control[(node, control)] += gain;
    }

    /// Energy storage node: self-discharge and charge/discharge efficiencies
    pub fn add_storage(
        &mut self,
        node: usize,
        charge: usize,
        discharge: usize,
        storage: &StorageTypeRecord,
    ) {
        self.flows_state[(node, node)] -= storage.self_discharge_rate();
        self.flows_control[(node, charge)] += storage.charge_efficiency;
        self.flows_control[(node, discharge)] -= 1.0 / storage.discharge_efficiency;
    }

    /// Continuous-time (A, B, E)
    pub fn into_continuous(self) -> (DMatrix<f64>, DMatrix<f64>, DMatrix<f64>) {
        let Self {
            mut flows_state,
            mut flows_control,
            mut flows_disturbance,
            capacitance,
        } = self;
        for (i, c) in capacitance.iter().enumerate() {
            flows_state.row_mut(i).scale_mut(1.0 / c);
            flows_control.row_mut(i).scale_mut(1.0 / c);
            flows_disturbance.row_mut(i).scale_mut(1.0 / c);
        }
        (flows_state, flows_control, flows_disturbance)
    }
}

/// Where a surface sits in the network
pub enum SurfaceLink {
    /// Massless: direct conductance between zone and ambient
    ZoneToAmbient { zone: usize, h: f64 },
    /// Massless partition between two zones
    ZoneToZone { zone: usize, other: usize, h: f64 },
    /// Massive node on the given sides
    Node {
        node: usize,
        zones: Vec<usize>,
        to_ambient: bool,
        h_side: f64,
    },
    /// Contributes nothing (massless internal mass)
    None,
}

/// Decide how a surface connects, given the index of its zone, its optional state
/// node and the index of the adjacent zone for partitions.
pub fn surface_link(
    surface: &SurfaceRecord,
    zone: usize,
    node: Option<usize>,
    adjacent: Option<usize>,
) -> SurfaceLink {
    let ua = surface.conductance_w_per_k() / WATT_PER_KW;
    match (&surface.surface_type, node) {
        (SurfaceType::Exterior | SurfaceType::Window, None) => SurfaceLink::ZoneToAmbient { zone, h: ua },
        (SurfaceType::Exterior, Some(node)) => SurfaceLink::Node {
            node,
            zones: vec![zone],
            to_ambient: true,
            h_side: 2.0 * ua,
        },
        (SurfaceType::Interior { .. }, None) => match adjacent {
            Some(other) => SurfaceLink::ZoneToZone { zone, other, h: ua },
            None => SurfaceLink::None,
        },
        (SurfaceType::Interior { .. }, Some(node)) => SurfaceLink::Node {
            node,
            zones: std::iter::once(zone).chain(adjacent).collect(),
            to_ambient: false,
            h_side: 2.0 * ua,
        },
        (SurfaceType::Adiabatic, Some(node)) => SurfaceLink::Node {
            node,
            zones: vec![zone],
            to_ambient: false,
            h_side: 2.0 * ua,
        },
        (SurfaceType::Adiabatic, None) | (SurfaceType::Window, Some(_)) => SurfaceLink::None,
    }
}
