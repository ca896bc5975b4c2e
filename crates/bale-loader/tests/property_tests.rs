//! Property tests: arbitrary (cyclic) dependency graphs always converge.

mod helpers;

use std::collections::BTreeSet;

use bale_loader::ModuleState;
use helpers::{Fixture, Log, fill, logged, slot};
use proptest::prelude::*;

const MODULES: usize = 8;

fn id(i: usize) -> String {
    format!("app/1.0.0/m{i}.js")
}

fn graphs() -> impl Strategy<Value = Vec<Vec<usize>>> {
    prop::collection::vec(prop::collection::vec(0..MODULES, 0..4), MODULES)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn every_reachable_module_executes_once(deps in graphs(), split in 0..MODULES) {
        // Modules below `split` ship in one script, the rest in another.
        let file = |i: usize| if i < split { "a.js" } else { "b.js" };
        let fixture = (0..MODULES).fold(Fixture::new(), |f, i| f.ships(&id(i), file(i)));
        let (mut loader, requests) = fixture.loader();
        let log = Log::default();

        let register = |url: &str| {
            (0..MODULES)
                .filter(|&i| format!("/{}", file(i)) == url)
                .map(|i| {
                    let specifiers: Vec<String> =
                        deps[i].iter().map(|d| format!("./m{d}.js")).collect();
                    let specifiers: Vec<&str> = specifiers.iter().map(String::as_str).collect();
                    logged(&log, &id(i), &specifiers)
                })
                .collect::<Vec<_>>()
        };

        let result = slot();
        loader.import("m0.js", fill(&result));
        let mut delivered = BTreeSet::new();
        while let Some(url) = requests.urls().into_iter().find(|u| !delivered.contains(u)) {
            delivered.insert(url.clone());
            loader.complete_fetch(&url, Ok(register(&url)));
        }

        prop_assert!(result.borrow().as_ref().is_some_and(|r| r.is_ok()));
        prop_assert!(requests.urls().len() <= 2);

        let mut reachable = BTreeSet::new();
        let mut stack = vec![0];
        while let Some(i) = stack.pop() {
            if reachable.insert(i) {
                stack.extend(deps[i].iter().copied());
            }
        }
        let executed: Vec<String> = log.borrow().clone();
        prop_assert_eq!(executed.len(), reachable.len());
        for i in reachable {
            prop_assert_eq!(loader.state(&id(i)), Some(ModuleState::Executed));
        }
    }
}
