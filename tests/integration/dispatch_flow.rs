//! Integration tests for wrapped functions on the recording side
//!
//! Tests the flow: Varsnap::call -> target -> ProduceQueue -> Producer -> store

use std::sync::Arc;

use varsnap::config::ENV_ENV;
use varsnap::{codec, Inputs, MockSnapStore, Value};

use super::common::{harness, production_env, PRODUCER_TOKEN};

fn divide(args: (i64, i64)) -> Result<i64, String> {
    let (x, y) = args;
    if y == 0 {
        return Err("division by zero".to_string());
    }
    Ok(x / y)
}

/// Test that results pass through unchanged and both outcomes are recorded
#[tokio::test]
async fn test_call_returns_result_and_records_outcome() {
    let store = Arc::new(MockSnapStore::new());
    let harness = harness(production_env(), store.clone());
    let wrapped = harness.varsnap(varsnap::qualname!(divide), divide);

    assert_eq!(wrapped.call((6, 3)), Ok(2));
    assert_eq!(wrapped.call((1, 0)), Err("division by zero".to_string()));
    harness.flush().await;

    let produced = store.produced();
    assert_eq!(produced.len(), 2);
    assert!(produced.iter().all(|request| request.producer_token == PRODUCER_TOKEN));
    assert!(produced
        .iter()
        .all(|request| request.signature == wrapped.producer().signature().as_str()));

    let outputs: Vec<Value> = produced
        .iter()
        .map(|request| codec::deserialize(&request.prod_outputs).expect("decode output"))
        .collect();
    assert_eq!(outputs[0], Value::Int(2));
    assert_eq!(outputs[1], Value::raised(Value::text("division by zero")));

    let inputs = Inputs::from_value(&codec::deserialize(&produced[0].inputs).expect("decode inputs"))
        .expect("inputs layout");
    assert_eq!(inputs.args, Value::seq([Value::Int(6), Value::Int(3)]));
}

/// Test that the wrapper keeps the function's name
#[tokio::test]
async fn test_wrapper_keeps_function_name() {
    let harness = harness(production_env(), Arc::new(MockSnapStore::new()));
    let wrapped = harness.varsnap(varsnap::qualname!(divide), divide);

    assert!(wrapped.name().ends_with("::dispatch_flow::divide"));
    assert_eq!(wrapped.short_name(), "divide");
    assert!(wrapped.producer().signature().as_str().starts_with("rust."));
}

/// Test that configuration changes apply to the very next call
#[tokio::test]
async fn test_toggling_role_stops_recording() {
    let env = production_env();
    let store = Arc::new(MockSnapStore::new());
    let harness = harness(env.clone(), store.clone());
    let wrapped = harness.varsnap("app::divide", divide);

    wrapped.call((4, 2)).expect("divides");
    env.set(ENV_ENV, "development");
    wrapped.call((4, 2)).expect("divides");
    env.set(ENV_ENV, "Production");
    wrapped.call((4, 2)).expect("divides");
    harness.flush().await;

    assert_eq!(store.produced().len(), 2);
}

/// Test that a failing store never reaches the caller
#[tokio::test]
async fn test_store_failures_are_invisible() {
    let store = Arc::new(MockSnapStore::new().failing_produce());
    let harness = harness(production_env(), store.clone());
    let wrapped = harness.varsnap("app::divide", divide);

    assert_eq!(wrapped.call((9, 3)), Ok(3));
    harness.flush().await;
    assert_eq!(store.produced().len(), 1);
}

/// Test that unrepresentable arguments skip recording but not the call
#[tokio::test]
async fn test_unrepresentable_arguments_are_not_recorded() {
    let store = Arc::new(MockSnapStore::new());
    let harness = harness(production_env(), store.clone());
    let halve = harness.varsnap("app::halve", |x: f64| Ok::<_, String>(x / 2.0));

    assert!(halve.call(f64::NAN).expect("halves").is_nan());
    assert_eq!(halve.call(3.0), Ok(1.5));
    harness.flush().await;

    assert_eq!(store.produced().len(), 1);
}

#[derive(Debug)]
struct Pricing {
    vat: f64,
    currency: String,
    __cache: Vec<i64>,
}

impl varsnap::Context for Pricing {
    fn capture_globals(&self, globals: &mut varsnap::GlobalsBuilder) {
        globals
            .capture("vat", &self.vat)
            .capture("currency", &self.currency)
            .capture("__cache", &self.__cache);
    }

    fn restore_globals(globals: &varsnap::Globals) -> Result<Self, varsnap::DeserializeError> {
        Ok(Self {
            vat: globals.restore("vat")?,
            currency: globals.restore("currency")?,
            __cache: Vec::new(),
        })
    }
}

/// Test that the context is recorded next to the arguments
#[tokio::test]
async fn test_context_is_recorded_as_globals() {
    let store = Arc::new(MockSnapStore::new());
    let harness = harness(production_env(), store.clone());
    let gross = harness.varsnap_with_context("app::gross", |pricing: &Pricing, net: i64| {
        Ok::<_, String>(format!("{:.2} {}", net as f64 * (1.0 + pricing.vat), pricing.currency))
    });
    let pricing = Pricing {
        vat: 0.2,
        currency: "EUR".into(),
        __cache: vec![1, 2, 3],
    };

    assert_eq!(gross.call_with(&pricing, 10), Ok("12.00 EUR".to_string()));
    harness.flush().await;

    let produced = store.produced();
    let inputs = Inputs::from_value(&codec::deserialize(&produced[0].inputs).expect("decode"))
        .expect("inputs layout");
    assert_eq!(inputs.globals.get("vat"), Some(&Value::Float(0.2)));
    assert_eq!(inputs.globals.get("currency"), Some(&Value::text("EUR")));
    assert_eq!(inputs.globals.get("__cache"), None);
}

/// Test that one unencodable global is left out without losing the snap
#[tokio::test]
async fn test_bad_global_is_dropped_alone() {
    let store = Arc::new(MockSnapStore::new());
    let harness = harness(production_env(), store.clone());
    let scale = harness.varsnap_with_context("app::scale", |globals: &varsnap::Globals, x: i64| -> Result<f64, String> {
        let rate: f64 = globals.restore("rate").map_err(|err| err.to_string())?;
        Ok(x as f64 * rate)
    });
    let mut globals = varsnap::Globals::new();
    globals.set("rate", Value::Float(0.5));
    globals.set("bad", Value::Float(f64::NAN));

    assert_eq!(scale.call_with(&globals, 4), Ok(2.0));
    harness.flush().await;

    let produced = store.produced();
    assert_eq!(produced.len(), 1);
    let inputs = Inputs::from_value(&codec::deserialize(&produced[0].inputs).expect("decode"))
        .expect("inputs layout");
    assert_eq!(inputs.globals.get("rate"), Some(&Value::Float(0.5)));
    assert_eq!(inputs.globals.get("bad"), None);
}
