//! Request derives with every marker combination compile

use crudless::{EffectivePolicy, NoResult, PolicyBase, Request};

#[derive(PolicyBase)]
#[crudless(name = "audited", skip_transaction)]
struct Audited;

#[derive(PolicyBase)]
#[crudless(maybe_validate, base = Audited)]
struct Tracked;

#[derive(Request)]
struct Ping;

#[derive(Request)]
#[crudless(result = Vec<String>, validate, base = Tracked)]
struct Search {
    query: String,
}

fn takes_command<R: Request<Result = NoResult>>() {}

fn main() {
    let search = Search { query: String::new() };
    assert!(search.query.is_empty());

    let policy = EffectivePolicy::resolve::<Search>();
    assert!(policy.validate);
    assert!(policy.maybe_validate);
    assert!(policy.skip_transaction);
    assert_eq!(Audited::NAME, "audited");
    assert_eq!(Tracked::NAME, "Tracked");

    takes_command::<Ping>();
}
