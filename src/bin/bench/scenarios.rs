// Scenario Definitions
// Each scenario is a fixed set of initial designs, run under several policies

use fss_engine::{OperationsKind, StoragePenalty};

// ─── Scenario Configuration ─────────────────────────────────────────────────

pub struct Scenario {
    pub name: &'static str,
    pub label: &'static str,
    pub federates: usize,
    pub turns: u32,
    /// Zero grants each federate the cost of its designs
    pub initial_cash: i64,
    pub designs: &'static [&'static str],
    pub variants: &'static [Variant],
}

pub struct Variant {
    pub label: &'static str,
    pub operations: OperationsKind,
    pub federation_operations: Option<OperationsKind>,
    /// Replaces the scheduler preset's storage penalty
    pub storage_penalty: Option<StoragePenalty>,
}

const SOLO: &[Variant] = &[
    Variant { label: "simple", operations: OperationsKind::Simple, federation_operations: None, storage_penalty: None },
    Variant { label: "dynamic", operations: OperationsKind::Dynamic, federation_operations: None, storage_penalty: None },
];

const SOLO_OPPORTUNITY: &[Variant] = &[
    Variant { label: "simple", operations: OperationsKind::Simple, federation_operations: None, storage_penalty: None },
    Variant { label: "dynamic", operations: OperationsKind::Dynamic, federation_operations: None, storage_penalty: None },
    Variant {
        label: "dynamic-opportunity",
        operations: OperationsKind::Dynamic,
        federation_operations: None,
        storage_penalty: Some(StoragePenalty::OpportunityCost),
    },
];

const SHARED: &[Variant] = &[
    Variant { label: "simple", operations: OperationsKind::Simple, federation_operations: None, storage_penalty: None },
    Variant { label: "dynamic", operations: OperationsKind::Dynamic, federation_operations: None, storage_penalty: None },
    Variant {
        label: "federation",
        operations: OperationsKind::Dynamic,
        federation_operations: Some(OperationsKind::DynamicFederation),
        storage_penalty: None,
    },
    Variant {
        label: "fixed-cost",
        operations: OperationsKind::Dynamic,
        federation_operations: Some(OperationsKind::FixedCostFederation),
        storage_penalty: None,
    },
    Variant {
        label: "dynamic-fixed-cost",
        operations: OperationsKind::Dynamic,
        federation_operations: Some(OperationsKind::DynamicFixedCostFederation),
        storage_penalty: None,
    },
];

// ─── Scenarios ──────────────────────────────────────────────────────────────

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "SOLO_LEO",
            label: "One VIS smallsat, one station",
            federates: 1,
            turns: 24,
            initial_cash: 1200,
            designs: &["1.SmallSat@LEO1,VIS,pSGL", "1.GroundSta@SUR1,pSGL"],
            variants: SOLO,
        },
        Scenario {
            name: "SOLO_DUAL_SENSOR",
            label: "SAR+VIS mediumsat, two stations",
            federates: 1,
            turns: 24,
            initial_cash: 0,
            designs: &[
                "1.MediumSat@LEO1,SAR,VIS,pSGL,pSGL",
                "1.GroundSta@SUR1,pSGL",
                "1.GroundSta@SUR4,pSGL",
            ],
            variants: SOLO_OPPORTUNITY,
        },
        Scenario {
            name: "SOLO_RELAY",
            label: "Sensing smallsat relayed via GEO",
            federates: 1,
            turns: 24,
            initial_cash: 0,
            designs: &[
                "1.SmallSat@LEO2,VIS,pISL",
                "1.MediumSat@GEO1,pISL,pISL,pSGL,pSGL",
                "1.GroundSta@SUR1,pSGL",
            ],
            variants: SOLO,
        },
        Scenario {
            name: "PAIR_SHARED_GROUND",
            label: "Two operators, one station each",
            federates: 2,
            turns: 24,
            initial_cash: 0,
            designs: &[
                "1.SmallSat@LEO1,VIS,pSGL",
                "2.SmallSat@LEO3,SAR,pSGL",
                "1.GroundSta@SUR1,pSGL",
                "2.GroundSta@SUR4,pSGL",
            ],
            variants: SHARED,
        },
        Scenario {
            name: "PAIR_CROSSLINK",
            label: "Sensor operator and relay operator",
            federates: 2,
            turns: 24,
            initial_cash: 0,
            designs: &[
                "1.SmallSat@LEO6,VIS,pISL",
                "2.MediumSat@LEO1,VIS,pISL,pSGL,pSGL",
                "2.GroundSta@SUR1,pSGL",
            ],
            variants: SHARED,
        },
    ]
}
