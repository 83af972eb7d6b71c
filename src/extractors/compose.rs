// src/extractors/compose.rs

//! Composite features built from atomic radio answers.
//!
//! Every composer takes its atomic inputs out of the working feature set
//! before inserting the composite, so no atomic key survives into the output.
//! Case analysis is exhaustive; any Unknown input the composite depends on
//! yields an explicit "Unclear" sentence.

use crate::extractors::features::FeatureSet;
use crate::extractors::questions::*;
use crate::extractors::radio::RadioAnswer::{self, No, Unknown, Yes};

pub const SUBSCRIBER_OPT_OUT_CAPABILITY: &str = "subscriber_opt_out_capability";
pub const COUNTERPARTY_SELECTION: &str = "counterparty_selection";
pub const TRADING_ACCESS_SUMMARY: &str = "trading_access_summary";
pub const SUPPORTS_IOIS: &str = "supports_iois";
pub const SEGMENTATION_TAGS: &str = "segmentation_tags";

pub fn opt_out_sentence(bdo: RadioAnswer, affiliate: RadioAnswer) -> &'static str {
    match (bdo, affiliate) {
        (Yes, Yes) => "Yes — Subscriber can opt out of both the ATS operator and its affiliates",
        (Yes, No) => "Yes — Subscriber can opt out of ATS operator but not affiliates",
        (No, Yes) => "Yes — Subscriber can opt out of affiliates but not ATS operator",
        (No, No) => "No — Subscriber cannot opt out from either",
        (Unknown, _) | (_, Unknown) => {
            "Unclear — at least one of the two opt-out answers was not found or could not be parsed"
        }
    }
}

pub fn counterparty_sentence(supported: RadioAnswer, uniform: RadioAnswer) -> &'static str {
    match (supported, uniform) {
        (Yes, Yes) => "Yes — counter-party selection procedures are uniform",
        (Yes, No) => "Yes — counter-party selection procedures are not uniform",
        (Yes, Unknown) => {
            "Unclear — counter-party selection is supported but uniformity could not be determined"
        }
        (No, _) => "No — orders cannot be designated to interact or not interact with specific counter-parties",
        (Unknown, _) => "Unclear — counter-party selection answer was not found or could not be parsed",
    }
}

pub fn ioi_sentence(supported: RadioAnswer, uniform: RadioAnswer) -> &'static str {
    match (supported, uniform) {
        (Yes, Yes) => "Yes — terms and conditions are uniform",
        (Yes, No) => "Yes — terms and conditions are not uniform",
        (Yes, Unknown) => "Unclear — IOIs are supported but uniformity of terms could not be determined",
        (No, _) => "No — the ATS does not send or receive IOIs or conditional orders",
        (Unknown, _) => "Unclear — IOI support answer was not found or could not be parsed",
    }
}

/// Prose summary of operator, affiliate and routing access.
pub fn trading_access_sentence(internal: RadioAnswer, affiliate: RadioAnswer, routing: RadioAnswer) -> String {
    let parts: Vec<&str> = [
        match internal {
            Yes => Some("ATS operator’s business units can trade on the ATS."),
            No => Some("ATS operator’s business units are not allowed to trade on the ATS."),
            Unknown => None,
        },
        match affiliate {
            Yes => Some("Affiliates can also send orders into the ATS."),
            No => Some("Affiliates are not allowed to send orders into the ATS."),
            Unknown => None,
        },
        match routing {
            Yes => Some("ATS can route orders to affiliated venues."),
            No => Some("ATS cannot route orders to affiliated venues."),
            Unknown => None,
        },
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        "Unclear — no trading-access answers were found".to_string()
    } else {
        parts.join(" ")
    }
}

pub fn subscriber_opt_out(set: &mut FeatureSet) {
    let bdo = set.take_answer(SUBSCRIBER_OPT_OUT_BDO);
    let affiliate = set.take_answer(SUBSCRIBER_OPT_OUT_AFFILIATE);
    set.insert(SUBSCRIBER_OPT_OUT_CAPABILITY, opt_out_sentence(bdo, affiliate));
}

pub fn counterparty_selection(set: &mut FeatureSet) {
    let supported = set.take_answer(COUNTERPARTY_SELECTION_SUPPORTED);
    let uniform = set.take_answer(COUNTERPARTY_SELECTION_UNIFORM);
    set.insert(COUNTERPARTY_SELECTION, counterparty_sentence(supported, uniform));
}

/// Re-emits the three access answers as words, followed by the summary.
pub fn trading_access(set: &mut FeatureSet) {
    let internal = set.take_answer(INTERNAL_TRADING_ALLOWED);
    let affiliate = set.take_answer(AFFILIATE_ACCESS_TO_ATS);
    let routing = set.take_answer(ROUTING_TO_AFFILIATE_VENUE);

    set.insert_answer(INTERNAL_TRADING_ALLOWED, internal);
    set.insert_answer(AFFILIATE_ACCESS_TO_ATS, affiliate);
    set.insert_answer(ROUTING_TO_AFFILIATE_VENUE, routing);
    set.insert(TRADING_ACCESS_SUMMARY, trading_access_sentence(internal, affiliate, routing));
}

pub fn ioi_support(set: &mut FeatureSet) {
    let supported = set.take_answer(IOI_SUPPORTED);
    let uniform = set.take_answer(IOI_UNIFORM_TREATMENT);
    set.insert(SUPPORTS_IOIS, ioi_sentence(supported, uniform));
}

/// Segmentation tags followed by the five segmentation answers, moved out of
/// their step-3 position.
pub fn segmentation(set: &mut FeatureSet, tags: &[String]) {
    let answers: Vec<(&'static str, RadioAnswer)> =
        SEGMENTATION_KEYS.iter().map(|&key| (key, set.take_answer(key))).collect();

    let tags = if tags.is_empty() {
        crate::extractors::patterns::NO_SEGMENTATION_TAGS.to_string()
    } else {
        tags.join(", ")
    };
    set.insert(SEGMENTATION_TAGS, tags);
    for (key, answer) in answers {
        set.insert_answer(key, answer);
    }
}
