use std::collections::BTreeSet;

use crate::types::{AuthScheme, TestItem, WorkspaceDocument};
use crate::validate::validator::Validator;

pub(crate) fn validate_workspace(v: &mut Validator, doc: &WorkspaceDocument) {
    v.unique_ids(
        "collections",
        "collection id",
        doc.collections.iter().map(|c| c.id.as_str()),
    );
    v.unique_ids(
        "requests",
        "request id",
        doc.collections
            .iter()
            .flat_map(|c| c.requests.iter().map(|r| r.id.as_str())),
    );
    v.unique_ids(
        "environments",
        "environment id",
        doc.environments.iter().map(|e| e.id.as_str()),
    );
    v.unique_ids("auths", "auth id", doc.auths.iter().map(|a| a.id.as_str()));
    v.unique_ids("flows", "flow id", doc.flows.iter().map(|f| f.id.as_str()));
    v.unique_ids("suites", "suite id", doc.suites.iter().map(|s| s.id.as_str()));

    for (i, a) in doc.auths.iter().enumerate() {
        if let AuthScheme::ApiKey { key, .. } = &a.scheme {
            v.require_non_empty(&format!("auths[{i}].key"), key);
        }
    }

    for (i, flow) in doc.flows.iter().enumerate() {
        super::flow::validate_flow(v, &format!("flows[{i}]"), flow);
    }

    for (i, suite) in doc.suites.iter().enumerate() {
        let path = format!("suites[{i}]");
        if suite.settings.concurrent_calls == 0 {
            v.push(format!("{path}.settings.concurrentCalls"), "must be at least 1");
        }
        v.unique_ids(
            &format!("{path}.items"),
            "item id",
            suite.items.iter().map(|it| it.id()),
        );
        for (j, item) in suite.items.iter().enumerate() {
            if let TestItem::Request(r) = item {
                v.unique_ids(
                    &format!("{path}.items[{j}].testCases"),
                    "test case id",
                    r.test_cases.iter().map(|c| c.id.as_str()),
                );
            }
        }
    }

    let env_ids: BTreeSet<&str> = doc.environments.iter().map(|e| e.id.as_str()).collect();
    for (i, suite) in doc.suites.iter().enumerate() {
        if let Some(env) = &suite.default_env_id {
            if !env_ids.contains(env.as_str()) {
                v.push(
                    format!("suites[{i}].defaultEnvId"),
                    format!("unknown environment '{env}'"),
                );
            }
        }
    }
}
