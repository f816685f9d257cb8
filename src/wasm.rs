use crate::io::{BufferConsole, ThreadRandom};
use crate::vm::{Vm, VmConfig};
use wasm_bindgen::prelude::wasm_bindgen;
use wasm_bindgen::JsValue;

/// Runs a program with no input and returns everything it printed
#[wasm_bindgen]
pub fn run_fsnail(source: &str) -> Result<String, JsValue> {
    let mut vm = Vm::with_io(
        VmConfig::default_text(source),
        BufferConsole::new(),
        ThreadRandom::default(),
    )?;
    vm.run()?;

    Ok(vm.console_mut().take_output())
}

#[cfg(test)]
mod tests {
    use crate::io::{BufferConsole, ThreadRandom};
    use crate::vm::{Vm, VmConfig, VmError};

    // JsValue is unusable off wasm targets, so this drives the same pipeline directly
    #[test]
    fn buffered_run() -> Result<(), VmError> {
        let mut vm = Vm::with_io(
            VmConfig::default_text("push 3 push 4 mult outint printnl \"\""),
            BufferConsole::new(),
            ThreadRandom::default(),
        )?;
        vm.run()?;
        assert_eq!(vm.console_mut().take_output(), "12\n");
        assert!(vm.console().output().is_empty());

        Ok(())
    }
}
