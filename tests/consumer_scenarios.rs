mod common;

use common::{send_request, TestError};
use covenant::{
    each_like, like, ContractScenario, Error, Method, Pattern, RequestMatcher, ResponseTemplate,
};
use hyper::{Body, Request, StatusCode};
use serde_json::{json, Value};
use std::{fs, path::Path};

fn dogs_scenario(output_dir: &Path) -> ContractScenario {
    let mut scenario = ContractScenario::new("dog-consumer", "dog-api");
    scenario.set_output_dir(output_dir);
    scenario
        .given("i have a list of dogs")
        .upon_receiving("a request for all dogs")
        .with_request(
            RequestMatcher::new(Method::Get, "/dogs")
                .with_query("from", "today")
                .with_header("accept", "application/json"),
        )
        .will_respond_with(
            ResponseTemplate::new(200)
                .with_header("content-type", "application/json")
                .with_body(Pattern::object([("dog", like(1))])),
        );

    scenario
}

fn dogs_request(base_url: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(format!("{}/dogs?from=today", base_url))
        .header("accept", "application/json")
        .body(Body::empty())
        .unwrap()
}

fn plain_get<S: AsRef<str>>(url: S) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(url.as_ref())
        .body(Body::empty())
        .unwrap()
}

fn contract_file(output_dir: &Path) -> std::path::PathBuf {
    output_dir.join("dog-consumer-dog-api.json")
}

#[tokio::test]
async fn a_matching_request_gets_the_declared_response() {
    let output_dir = tempfile::tempdir().unwrap();
    let scenario = dogs_scenario(output_dir.path());

    let body = scenario
        .execute(|handle| async move {
            let (status, headers, bytes) = send_request(dogs_request(handle.base_url())).await?;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(headers.get("content-type").unwrap(), "application/json");

            Ok::<_, TestError>(serde_json::from_slice::<Value>(&bytes)?)
        })
        .await
        .unwrap();

    assert_eq!(body, json!({ "dog": 1 }));
}

#[tokio::test]
async fn a_completed_scenario_writes_the_contract() {
    let output_dir = tempfile::tempdir().unwrap();
    let mut scenario = ContractScenario::new("dog-consumer", "dog-api");
    scenario.set_output_dir(output_dir.path());
    scenario
        .given("i have a list of dogs")
        .upon_receiving("a request for all dogs")
        .with_request(
            RequestMatcher::new(Method::Get, "/dogs")
                .with_query("from", "today")
                .with_header("accept", "application/json"),
        )
        .will_respond_with(
            ResponseTemplate::new(200)
                .with_header("content-type", "application/json")
                .with_body(each_like(json!({ "dog": 1 }))),
        );

    scenario
        .execute(|handle| async move {
            let (status, _, _) = send_request(dogs_request(handle.base_url())).await?;
            assert_eq!(status, StatusCode::OK);
            Ok::<_, TestError>(())
        })
        .await
        .unwrap();

    let written = fs::read_to_string(contract_file(output_dir.path())).unwrap();
    let contract: Value = serde_json::from_str(&written).unwrap();

    assert_eq!(contract["consumer"]["name"], "dog-consumer");
    assert_eq!(contract["provider"]["name"], "dog-api");

    let interaction = &contract["interactions"][0];
    assert_eq!(interaction["description"], "a request for all dogs");
    assert_eq!(interaction["providerState"], "i have a list of dogs");
    assert_eq!(interaction["request"]["method"], "GET");
    assert_eq!(interaction["request"]["path"], "/dogs");
    assert_eq!(interaction["request"]["query"]["from"], "today");
    assert_eq!(interaction["request"]["headers"]["accept"], "application/json");
    assert!(interaction["request"]["headers"].get("host").is_none());
    assert_eq!(interaction["response"]["status"], 200);
    assert_eq!(interaction["response"]["body"]["match"], "eachLike");
    assert_eq!(
        interaction["response"]["body"]["element"]["value"],
        json!({ "dog": 1 })
    );
}

#[tokio::test]
async fn repeated_runs_produce_the_identical_contract() {
    async fn run(scenario: &ContractScenario) {
        scenario
            .execute(|handle| async move {
                let (status, _, _) = send_request(dogs_request(handle.base_url())).await?;
                assert_eq!(status, StatusCode::OK);
                Ok::<_, TestError>(())
            })
            .await
            .unwrap();
    }

    let output_dir = tempfile::tempdir().unwrap();
    let scenario = dogs_scenario(output_dir.path());

    run(&scenario).await;
    let first = fs::read_to_string(contract_file(output_dir.path())).unwrap();

    run(&scenario).await;
    let second = fs::read_to_string(contract_file(output_dir.path())).unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn a_rendered_json_body_defaults_its_content_type() {
    let output_dir = tempfile::tempdir().unwrap();
    let mut scenario = ContractScenario::new("dog-consumer", "dog-api");
    scenario.set_output_dir(output_dir.path());
    scenario
        .upon_receiving("a request for all dogs")
        .with_request(RequestMatcher::new(Method::Get, "/dogs"))
        .will_respond_with(ResponseTemplate::new(200).with_body(json!({ "dog": 1 })));

    scenario
        .execute(|handle| async move {
            let (status, headers, _) = send_request(plain_get(handle.url("/dogs"))).await?;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(headers.get("content-type").unwrap(), "application/json");

            Ok::<_, TestError>(())
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn a_request_without_the_declared_query_gets_a_diagnostic_500() {
    let output_dir = tempfile::tempdir().unwrap();
    let scenario = dogs_scenario(output_dir.path());

    let result = scenario
        .execute(|handle| async move {
            let request = Request::builder()
                .method("GET")
                .uri(handle.url("/dogs"))
                .header("accept", "application/json")
                .body(Body::empty())?;
            let (status, _, bytes) = send_request(request).await?;

            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

            let diagnostic: Value = serde_json::from_slice(&bytes)?;
            assert_eq!(
                diagnostic["closestInteraction"]["description"],
                "a request for all dogs"
            );
            assert_eq!(
                diagnostic["closestInteraction"]["mismatches"][0]["field"],
                "query.from"
            );
            assert_eq!(
                diagnostic["closestInteraction"]["mismatches"][0]["found"],
                "nothing"
            );

            // the server keeps serving after a miss
            let (status, _, _) = send_request(dogs_request(handle.base_url())).await?;
            assert_eq!(status, StatusCode::OK);

            Ok::<_, TestError>(())
        })
        .await;

    match result {
        Err(error @ Error::NoMatch(_)) => {
            let message = error.to_string();
            assert!(message.contains("a request for all dogs"), "{}", message);
            assert!(message.contains("query.from"), "{}", message);

            match error {
                Error::NoMatch(unmatched) => {
                    assert_eq!(unmatched.len(), 1);
                    assert_eq!(unmatched[0].request.path, "/dogs");
                }
                _ => unreachable!(),
            }
        }
        other => panic!("expected a no-match failure, got {:?}", other),
    }

    assert!(!contract_file(output_dir.path()).exists());
}

#[tokio::test]
async fn wrong_calls_are_aggregated_into_one_report() {
    let output_dir = tempfile::tempdir().unwrap();
    let scenario = dogs_scenario(output_dir.path());

    let result = scenario
        .execute(|handle| async move {
            let (status, _, _) = send_request(plain_get(handle.url("/cats"))).await?;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            let (status, _, _) = send_request(plain_get(handle.url("/birds"))).await?;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

            Ok::<_, TestError>(())
        })
        .await;

    match result {
        Err(Error::NoMatch(unmatched)) => {
            assert_eq!(unmatched.len(), 2);
            assert_eq!(unmatched[0].request.path, "/cats");
            assert_eq!(unmatched[1].request.path, "/birds");
        }
        other => panic!("expected one aggregated report, got {:?}", other),
    }
}

#[tokio::test]
async fn an_uninvoked_interaction_fails_the_scenario() {
    let output_dir = tempfile::tempdir().unwrap();
    let mut scenario = ContractScenario::new("dog-consumer", "dog-api");
    scenario.set_output_dir(output_dir.path());
    scenario
        .given("i have a list of dogs")
        .upon_receiving("a first request for dogs")
        .with_request(RequestMatcher::new(Method::Get, "/dogs"))
        .will_respond_with(ResponseTemplate::new(200).with_body(json!({ "dog": 1 })));
    scenario
        .given("the kennel is empty")
        .upon_receiving("a second request for dogs")
        .with_request(RequestMatcher::new(Method::Get, "/dogs"))
        .will_respond_with(ResponseTemplate::new(200).with_body(json!({ "dog": 2 })));

    let result = scenario
        .execute(|handle| async move {
            let (status, _, bytes) = send_request(plain_get(handle.url("/dogs"))).await?;

            assert_eq!(status, StatusCode::OK);
            // first-declared interaction wins the tie
            assert_eq!(serde_json::from_slice::<Value>(&bytes)?, json!({ "dog": 1 }));

            Ok::<_, TestError>(())
        })
        .await;

    match result {
        Err(Error::IncompleteContract(missing)) => {
            assert_eq!(missing, vec![String::from("a second request for dogs")]);
        }
        other => panic!("expected an incomplete contract, got {:?}", other),
    }

    assert!(!contract_file(output_dir.path()).exists());
}

#[tokio::test]
async fn a_callback_failure_is_propagated_verbatim() {
    let output_dir = tempfile::tempdir().unwrap();
    let scenario = dogs_scenario(output_dir.path());

    let result: Result<(), Error> = scenario
        .execute(|handle| async move {
            let (status, _, _) = send_request(dogs_request(handle.base_url())).await?;
            assert_eq!(status, StatusCode::OK);

            Err::<(), TestError>("the dog payload was not what i wanted".into())
        })
        .await;

    match result {
        Err(Error::Callback(e)) => {
            assert_eq!(e.to_string(), "the dog payload was not what i wanted");
        }
        other => panic!("expected the callback error, got {:?}", other),
    }

    // every interaction was invoked, but a failed scenario writes nothing
    assert!(!contract_file(output_dir.path()).exists());
}

#[tokio::test]
async fn a_callback_failure_outranks_the_engine_reports() {
    let output_dir = tempfile::tempdir().unwrap();
    let scenario = dogs_scenario(output_dir.path());

    let result: Result<(), Error> = scenario
        .execute(|handle| async move {
            let (status, _, _) = send_request(plain_get(handle.url("/cats"))).await?;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

            Err::<(), TestError>("my own assertion failed first".into())
        })
        .await;

    match result {
        Err(Error::Callback(e)) => {
            assert_eq!(e.to_string(), "my own assertion failed first");
        }
        other => panic!("expected the callback error to win, got {:?}", other),
    }
}

#[tokio::test]
async fn an_empty_scenario_is_a_declaration_error() {
    let scenario = ContractScenario::new("dog-consumer", "dog-api");

    match scenario.execute(|_| async { Ok::<_, TestError>(()) }).await {
        Err(Error::IncompleteDeclaration(_)) => (),
        other => panic!("expected a declaration error, got {:?}", other),
    }
}

#[tokio::test]
async fn a_declaration_missing_its_response_is_rejected() {
    let mut scenario = ContractScenario::new("dog-consumer", "dog-api");
    scenario
        .upon_receiving("a request that was never finished")
        .with_request(RequestMatcher::new(Method::Get, "/dogs"));

    match scenario.execute(|_| async { Ok::<_, TestError>(()) }).await {
        Err(Error::IncompleteDeclaration(what)) => {
            assert!(what.contains("a request that was never finished"), "{}", what);
        }
        other => panic!("expected a declaration error, got {:?}", other),
    }
}

#[test]
fn scenarios_can_run_on_a_runtime_of_their_own() {
    let output_dir = tempfile::tempdir().unwrap();
    let scenario = dogs_scenario(output_dir.path());

    let body = scenario
        .execute_blocking(|handle| async move {
            let (status, _, bytes) = send_request(dogs_request(handle.base_url())).await?;
            assert_eq!(status, StatusCode::OK);

            Ok::<_, TestError>(serde_json::from_slice::<Value>(&bytes)?)
        })
        .unwrap();

    assert_eq!(body, json!({ "dog": 1 }));
    assert!(contract_file(output_dir.path()).exists());
}
