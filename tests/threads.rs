use cil2lir::linear::{lower, LoweringStrategy};
use cil2lir::module::Module;
use std::thread;

fn demo() -> Module {
    Module::read(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/demos/common_constructs.json"
    ))
    .unwrap()
}

fn lower_all(module: &Module, strategy: LoweringStrategy) -> Vec<Vec<String>> {
    module
        .types()
        .iter()
        .flat_map(|type_def| type_def.methods())
        .filter(|method| method.has_body())
        .map(|method| {
            let instructions = module.decode(method).unwrap();
            lower(
                strategy,
                &instructions,
                method.exception_regions(),
                method.signature(),
            )
            .unwrap()
            .instructions
            .iter()
            .map(ToString::to_string)
            .collect()
        })
        .collect()
}

#[test]
fn methods_lower_independently_on_separate_threads() {
    let module = demo();
    let sequential = lower_all(&module, LoweringStrategy::CfgTraversal);

    let methods: Vec<_> = module
        .types()
        .iter()
        .flat_map(|type_def| type_def.methods())
        .filter(|method| method.has_body())
        .collect();

    let parallel: Vec<Vec<String>> = thread::scope(|scope| {
        let handles: Vec<_> = methods
            .iter()
            .map(|method| {
                let module = &module;
                scope.spawn(move || {
                    let instructions = module.decode(method).unwrap();
                    lower(
                        LoweringStrategy::CfgTraversal,
                        &instructions,
                        method.exception_regions(),
                        method.signature(),
                    )
                    .unwrap()
                    .instructions
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    assert_eq!(parallel, sequential);
}

#[test]
fn one_module_shared_by_many_threads() {
    let module = demo();
    let expected = lower_all(&module, LoweringStrategy::SingleForwardPass);
    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                assert_eq!(
                    lower_all(&module, LoweringStrategy::SingleForwardPass),
                    expected
                );
            });
        }
    });
}
