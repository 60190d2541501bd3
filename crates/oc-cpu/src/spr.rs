//! Special-purpose register numbers

pub const SPR_XER: usize = 1;
pub const SPR_LR: usize = 8;
pub const SPR_CTR: usize = 9;
pub const SPR_DSISR: usize = 18;
pub const SPR_DAR: usize = 19;
pub const SPR_DEC: usize = 22;
pub const SPR_SDR: usize = 25;
pub const SPR_SRR0: usize = 26;
pub const SPR_SRR1: usize = 27;
pub const SPR_TL: usize = 268;
pub const SPR_TU: usize = 269;
pub const SPR_PVR: usize = 287;

pub const SPR_IBAT0U: usize = 528;
pub const SPR_IBAT0L: usize = 529;
pub const SPR_IBAT1U: usize = 530;
pub const SPR_IBAT1L: usize = 531;
pub const SPR_IBAT2U: usize = 532;
pub const SPR_IBAT2L: usize = 533;
pub const SPR_IBAT3U: usize = 534;
pub const SPR_IBAT3L: usize = 535;
pub const SPR_DBAT0U: usize = 536;
pub const SPR_DBAT0L: usize = 537;
pub const SPR_DBAT1U: usize = 538;
pub const SPR_DBAT1L: usize = 539;
pub const SPR_DBAT2U: usize = 540;
pub const SPR_DBAT2L: usize = 541;
pub const SPR_DBAT3U: usize = 542;
pub const SPR_DBAT3L: usize = 543;

// Broadway adds four more pairs of each kind
pub const SPR_IBAT4U: usize = 560;
pub const SPR_IBAT4L: usize = 561;
pub const SPR_IBAT5U: usize = 562;
pub const SPR_IBAT5L: usize = 563;
pub const SPR_IBAT6U: usize = 564;
pub const SPR_IBAT6L: usize = 565;
pub const SPR_IBAT7U: usize = 566;
pub const SPR_IBAT7L: usize = 567;
pub const SPR_DBAT4U: usize = 568;
pub const SPR_DBAT4L: usize = 569;
pub const SPR_DBAT5U: usize = 570;
pub const SPR_DBAT5L: usize = 571;
pub const SPR_DBAT6U: usize = 572;
pub const SPR_DBAT6L: usize = 573;
pub const SPR_DBAT7U: usize = 574;
pub const SPR_DBAT7L: usize = 575;

pub const SPR_HID2: usize = 920;
pub const SPR_WPAR: usize = 921;
pub const SPR_HID0: usize = 1008;
pub const SPR_HID1: usize = 1009;
pub const SPR_HID4: usize = 1011;
pub const SPR_L2CR: usize = 1017;

/// Upper/lower SPR pairs of the instruction BATs, in BAT index order
pub const IBAT_PAIRS: [(usize, usize); 8] = [
    (SPR_IBAT0U, SPR_IBAT0L),
    (SPR_IBAT1U, SPR_IBAT1L),
    (SPR_IBAT2U, SPR_IBAT2L),
    (SPR_IBAT3U, SPR_IBAT3L),
    (SPR_IBAT4U, SPR_IBAT4L),
    (SPR_IBAT5U, SPR_IBAT5L),
    (SPR_IBAT6U, SPR_IBAT6L),
    (SPR_IBAT7U, SPR_IBAT7L),
];

/// Upper/lower SPR pairs of the data BATs, in BAT index order
pub const DBAT_PAIRS: [(usize, usize); 8] = [
    (SPR_DBAT0U, SPR_DBAT0L),
    (SPR_DBAT1U, SPR_DBAT1L),
    (SPR_DBAT2U, SPR_DBAT2L),
    (SPR_DBAT3U, SPR_DBAT3L),
    (SPR_DBAT4U, SPR_DBAT4L),
    (SPR_DBAT5U, SPR_DBAT5L),
    (SPR_DBAT6U, SPR_DBAT6L),
    (SPR_DBAT7U, SPR_DBAT7L),
];
