//! Contract descriptor resolution

use forecast_ledger::ledger::abi::STORE_PREDICTION;
use forecast_ledger::ledger::descriptor::ContractDescriptor;
use forecast_ledger::ledger::error::LedgerError;

const ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

fn descriptor_json(networks: &str) -> String {
    format!(
        r#"{{
            "contractName": "Predictions",
            "abi": [
                {{ "type": "constructor", "inputs": [] }},
                {{ "type": "event", "name": "PredictionStored", "inputs": [
                    {{ "name": "symbol", "type": "string" }}
                ] }},
                {{ "type": "function", "name": "storePrediction", "inputs": [
                    {{ "name": "symbol", "type": "string" }},
                    {{ "name": "price", "type": "uint256" }}
                ] }}
            ],
            "networks": {}
        }}"#,
        networks
    )
}

#[test]
fn resolves_address_and_signature() {
    let raw = descriptor_json(&format!(r#"{{ "5777": {{ "address": "{}" }} }}"#, ADDRESS));
    let resolved = ContractDescriptor::from_json(&raw)
        .unwrap()
        .resolve(STORE_PREDICTION)
        .unwrap();

    assert_eq!(resolved.address, ADDRESS);
    assert_eq!(resolved.signature, "storePrediction(string,uint256)");
}

#[test]
fn first_deployed_network_wins() {
    let second = "0x0000000000000000000000000000000000000001";
    let raw = descriptor_json(&format!(
        r#"{{ "5777": {{ "events": {{}} }}, "1337": {{ "address": "{}" }}, "1": {{ "address": "{}" }} }}"#,
        ADDRESS, second
    ));
    let descriptor = ContractDescriptor::from_json(&raw).unwrap();
    assert_eq!(descriptor.address().unwrap(), ADDRESS);
}

#[test]
fn undeployed_contract_is_unavailable() {
    let descriptor = ContractDescriptor::from_json(&descriptor_json("{}")).unwrap();
    assert!(matches!(
        descriptor.address(),
        Err(LedgerError::Unavailable(_))
    ));
}

#[test]
fn malformed_address_is_invalid() {
    let raw = descriptor_json(r#"{ "5777": { "address": "0x1234" } }"#);
    let descriptor = ContractDescriptor::from_json(&raw).unwrap();
    assert!(matches!(
        descriptor.address(),
        Err(LedgerError::Descriptor(_))
    ));
}

#[test]
fn unknown_function_is_invalid() {
    let descriptor = ContractDescriptor::from_json(&descriptor_json("{}")).unwrap();
    assert!(matches!(
        descriptor.function_signature("getPrediction"),
        Err(LedgerError::Descriptor(_))
    ));
}

#[test]
fn unparsable_descriptor_is_invalid() {
    assert!(matches!(
        ContractDescriptor::from_json("{ not json"),
        Err(LedgerError::Descriptor(_))
    ));
}

#[test]
fn missing_file_is_unavailable() {
    let err = ContractDescriptor::load("/nonexistent/build/contracts/Predictions.json").unwrap_err();
    assert!(matches!(err, LedgerError::Unavailable(_)));
}

#[test]
fn loads_from_disk() {
    let path = std::env::temp_dir().join(format!("descriptor-{}.json", std::process::id()));
    let raw = descriptor_json(&format!(r#"{{ "5777": {{ "address": "{}" }} }}"#, ADDRESS));
    std::fs::write(&path, raw).unwrap();

    let descriptor = ContractDescriptor::load(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(descriptor.address().unwrap(), ADDRESS);
}
