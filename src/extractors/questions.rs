// src/extractors/questions.rs

//! Yes/No disclosure questions answered by radio buttons, keyed by the atomic
//! feature name each resolves into. Fragments are matched after label
//! normalization, so hyphenation and spacing here are irrelevant.

pub const SUBSCRIBER_OPT_OUT_BDO: &str = "subscriber_opt_out_bdo";
pub const SUBSCRIBER_OPT_OUT_AFFILIATE: &str = "subscriber_opt_out_affiliate";
pub const COUNTERPARTY_SELECTION_SUPPORTED: &str = "counterparty_selection_supported";
pub const COUNTERPARTY_SELECTION_UNIFORM: &str = "counterparty_selection_uniform";
pub const INTERNAL_TRADING_ALLOWED: &str = "internal_trading_allowed";
pub const AFFILIATE_ACCESS_TO_ATS: &str = "affiliate_access_to_ats";
pub const ROUTING_TO_AFFILIATE_VENUE: &str = "routing_to_affiliate_venue";
pub const ECN_STATUS: &str = "ecn_status";
pub const DISPLAY_TO_PERSONS: &str = "display_to_persons";
pub const DISPLAY_PROCEDURES_UNIFORM: &str = "display_procedures_uniform";
pub const IOI_SUPPORTED: &str = "ioi_supported";
pub const IOI_UNIFORM_TREATMENT: &str = "ioi_uniform_treatment";
pub const SEGMENTATION_SUPPORTED: &str = "segmentation_supported";
pub const SEGMENTATION_UNIFORM: &str = "segmentation_uniform";
pub const SEGMENTATION_CUSTOMER_FLAG: &str = "segmentation_customer_flag";
pub const SEGMENTATION_DISCLOSED: &str = "segmentation_disclosed";
pub const SEGMENTATION_DISCLOSURE_UNIFORM: &str = "segmentation_disclosure_uniform";

/// Segmentation answers carried into the segmentation block, in output order.
pub const SEGMENTATION_KEYS: [&str; 5] = [
    SEGMENTATION_SUPPORTED,
    SEGMENTATION_UNIFORM,
    SEGMENTATION_CUSTOMER_FLAG,
    SEGMENTATION_DISCLOSED,
    SEGMENTATION_DISCLOSURE_UNIFORM,
];

/// (atomic key, label fragment), resolved in this order.
pub const YES_NO_QUESTIONS: &[(&str, &str)] = &[
    // Subscriber opt-out (Part III Item 4)
    (
        SUBSCRIBER_OPT_OUT_BDO,
        "Can any Subscriber opt out from interacting with orders and trading interest of the Broker-Dealer Operator",
    ),
    (
        SUBSCRIBER_OPT_OUT_AFFILIATE,
        "opt out from interacting with the orders and trading interest of an Affiliate of the Broker-Dealer Operator",
    ),
    // Counter-party selection (Item 14)
    (
        COUNTERPARTY_SELECTION_SUPPORTED,
        "a. Can orders or trading interest be designated to interact or not interact",
    ),
    (COUNTERPARTY_SELECTION_UNIFORM, "b. If yes to Item 14(a)"),
    // Internal / affiliate trading access
    (
        INTERNAL_TRADING_ALLOWED,
        "Are business units of the Broker-Dealer Operator permitted to enter or direct the entry of orders",
    ),
    (
        AFFILIATE_ACCESS_TO_ATS,
        "Are Affiliates of the Broker-Dealer Operator permitted to enter or direct the entry of orders",
    ),
    (
        ROUTING_TO_AFFILIATE_VENUE,
        "be routed to a Trading Center operated or controlled by an Affiliate of the Broker-Dealer Operator",
    ),
    // Display & ECN status (Item 15)
    (ECN_STATUS, "operate as an Electronic Communication Network as defined in Rule 600"),
    (
        DISPLAY_TO_PERSONS,
        "displayed or made known to any Person (not including those employees",
    ),
    (
        DISPLAY_PROCEDURES_UNIFORM,
        "display procedures required to be identified in 15(b) the same",
    ),
    // IOIs / conditional orders (Item 9)
    (
        IOI_SUPPORTED,
        "send or receive any messages indicating trading interest (e.g., IOIs, actionable IOIs, or conditional orders)",
    ),
    (
        IOI_UNIFORM_TREATMENT,
        "b. If yes to Item 9(a), are the terms and conditions governing conditional orders",
    ),
    // Segmentation (Item 13)
    (SEGMENTATION_SUPPORTED, "segmented into categories, classifications, tiers, or levels"),
    (
        SEGMENTATION_UNIFORM,
        "segmentation of orders and trading interest the same for all Subscribers",
    ),
    (
        SEGMENTATION_CUSTOMER_FLAG,
        "identify orders or trading interest entered by a customer",
    ),
    (
        SEGMENTATION_DISCLOSED,
        "does the NMS Stock ATS disclose to any Person the designated segmented",
    ),
    (
        SEGMENTATION_DISCLOSURE_UNIFORM,
        "disclosures required to be identified in 13(d) the same",
    ),
];
