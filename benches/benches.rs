use criterion::{criterion_group, criterion_main, Criterion};
use wasmlink::memory_units::Pages;
use wasmlink::{
    Context, ImportDescriptor, Linker, MemoryInstance, ModuleInstance, NopExternals,
};

/// Builds a chain of `len` modules where every module imports the function
/// its predecessor exports and re-exports it, then links the whole context.
fn link_chain(len: usize) {
    let context = Context::new();
    let mut linker = Linker::new();

    let root = ModuleInstance::alloc("m0");
    let f = root.symbols_mut().declare_function();
    context.push_module(root.clone());
    linker.resolve_code_entry(&root, f.index());
    linker.resolve_function_export(&root, f.index(), "f").unwrap();

    for i in 1..len {
        let module = ModuleInstance::alloc(format!("m{}", i));
        let imported = module
            .symbols_mut()
            .import_function(ImportDescriptor::new(format!("m{}", i - 1), "f"));
        context.push_module(module.clone());
        linker.resolve_function_import(&module, &imported).unwrap();
        linker
            .resolve_function_export(&module, imported.index(), "f")
            .unwrap();
    }

    linker.try_link(&context, &mut NopExternals).unwrap();
}

fn bench_link_chain(c: &mut Criterion) {
    c.bench_function("link_chain_64", |b| b.iter(|| link_chain(64)));
}

fn bench_reset_module_state(c: &mut Criterion) {
    let context = Context::new();
    let module = ModuleInstance::alloc("main");
    module
        .symbols_mut()
        .set_memory(MemoryInstance::alloc(Pages(1), None).unwrap());

    let mut linker = Linker::new();
    for id in 0..16 {
        linker
            .resolve_data_section(&module, id, id * 64, vec![id as u8; 64], false)
            .unwrap();
    }
    context.push_module(module.clone());
    linker.try_link(&context, &mut NopExternals).unwrap();

    c.bench_function("reset_module_state", |b| {
        b.iter(|| linker.reset_module_state(&context, &module, true).unwrap())
    });
}

criterion_group!(benches, bench_link_chain, bench_reset_module_state);
criterion_main!(benches);
