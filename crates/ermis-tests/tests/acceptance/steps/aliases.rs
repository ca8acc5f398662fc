//! Alias, node and alarm steps.

use super::parse_arg;
use crate::world::ErmisWorld;
use cucumber::{given, then, when};
use ermis_tests::expectations::{Existence, ExpectedStatus, ObjectOutcome, RequestKind};
use ermis_tests::fixtures::alias::{HostgroupRole, UPDATED_BEST_HOSTS};
use ermis_tests::fixtures::RequestContext;

#[given(regex = r#"^that we are "([^"]*)" in the hostgroup$"#)]
fn hostgroup_role(world: &mut ErmisWorld, role: String) {
    let role: HostgroupRole = parse_arg(&role);
    world.hostgroup = Some(role.hostgroup().to_string());
}

#[given(regex = r#"^the LB alias "([^"]*)"$"#)]
async fn alias_existence(world: &mut ErmisWorld, existence: String) {
    let existence: Existence = parse_arg(&existence);
    let aliases = world.refetch_aliases().await;

    existence
        .check(aliases.is_present(), &format!("alias {}", world.alias_name()))
        .unwrap_or_else(|message| panic!("{}", message));
}

#[given(regex = r#"^the Node "([^"]*)"$"#)]
async fn node_existence(world: &mut ErmisWorld, existence: String) {
    let existence: Existence = parse_arg(&existence);
    let alias = world.refetch_alias().await;
    let node = &world.config().test_node;

    existence
        .check(alias.has_node(node), &format!("node {}", node))
        .unwrap_or_else(|message| {
            panic!(
                "{} (allowed: {:?}, forbidden: {:?})",
                message, alias.allowed_nodes, alias.forbidden_nodes
            )
        });
}

#[given(regex = r#"^the Alarm "([^"]*)"$"#)]
async fn alarm_existence(world: &mut ErmisWorld, existence: String) {
    let existence: Existence = parse_arg(&existence);
    let alias = world.refetch_alias().await;
    let alarm = world.config().test_alarm();

    existence
        .check(alias.has_alarm(&alarm), &format!("alarm {}", alarm))
        .unwrap_or_else(|message| panic!("{} (alarms: {:?})", message, alias.alarms));
}

#[when(regex = r#"^we do a "([^"]*)" request$"#)]
async fn do_request(world: &mut ErmisWorld, kind: String) {
    let kind: RequestKind = parse_arg(&kind);
    let config = world.config();
    let alarm = config.test_alarm();

    let context = RequestContext {
        alias_name: world.alias_name(),
        hostgroup: world.hostgroup.as_deref(),
        node: &config.test_node,
        alarm: &alarm,
    };

    let response = world
        .client()
        .perform(kind, &context)
        .await
        .unwrap_or_else(|e| panic!("{:?} request failed: {}", kind, e));
    world.record(response);
}

#[then(regex = r#"^we get a "([^"]*)" back$"#)]
fn status_is(world: &mut ErmisWorld, expected: String) {
    let expected: ExpectedStatus = parse_arg(&expected);
    let response = world.last_response();

    assert!(
        expected.accepts(response.status),
        "expected {} but got {}",
        expected,
        response.summary()
    );
}

#[then(regex = r#"^the object should "([^"]*)"$"#)]
async fn object_outcome(world: &mut ErmisWorld, outcome: String) {
    let outcome: ObjectOutcome = parse_arg(&outcome);

    if let Some(code) = outcome.expected_status() {
        let response = world.last_response();
        assert_eq!(
            response.status,
            code,
            "{:?}: unexpected response {}",
            outcome,
            response.summary()
        );
        return;
    }

    let alias = world.refetch_alias().await;
    let node = &world.config().test_node;

    match outcome {
        ObjectOutcome::Updated => assert_eq!(
            alias.best_hosts, UPDATED_BEST_HOSTS,
            "best_hosts was not updated"
        ),
        ObjectOutcome::HasNode => assert!(
            alias.has_allowed_node(node),
            "{} not in allowed nodes {:?}",
            node,
            alias.allowed_nodes
        ),
        ObjectOutcome::HasUpdatedNodes => assert!(
            alias.has_forbidden_node(node),
            "{} not in forbidden nodes {:?}",
            node,
            alias.forbidden_nodes
        ),
        ObjectOutcome::HasNoNode => assert!(
            !alias.has_node(node),
            "{} still listed (allowed: {:?}, forbidden: {:?})",
            node,
            alias.allowed_nodes,
            alias.forbidden_nodes
        ),
        ObjectOutcome::HasAlarm => {
            let alarm = world.config().test_alarm();
            assert!(
                alias.has_alarm(&alarm),
                "{} not in alarms {:?}",
                alarm,
                alias.alarms
            );
        }
        ObjectOutcome::HasNoAlarm => assert!(
            alias.alarms.is_empty(),
            "alarms still configured: {:?}",
            alias.alarms
        ),
        ObjectOutcome::Created | ObjectOutcome::NotCreated | ObjectOutcome::Deleted => {
            unreachable!("status-only outcomes are handled above")
        }
    }
}
