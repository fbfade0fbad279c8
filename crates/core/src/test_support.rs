// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

/// Proptest strategies for core runtime types.
#[cfg(feature = "proptest")]
pub mod strategies {
    use crate::value::Value;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    pub fn arb_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(|n| Value::Int(n as i64)),
            "[a-z]{0,8}".prop_map(Value::String),
        ]
    }

    pub fn arb_context() -> impl Strategy<Value = Value> {
        prop::collection::btree_map("[a-z]{1,6}", arb_scalar(), 0..5).prop_map(Value::Map)
    }

    pub fn arb_context_map() -> impl Strategy<Value = BTreeMap<String, Value>> {
        prop::collection::btree_map("[a-z]{1,6}", arb_scalar(), 0..5)
    }
}
