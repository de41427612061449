// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

use std::{collections::HashMap, marker::PhantomData};

use libloading::Library;
use snafu::{OptionExt, ResultExt, Snafu, Whatever, whatever};

use crate::{PortDirection, PortSpec};

type Handle = *mut libc::c_void;

#[derive(Clone, Copy)]
enum Accessor {
    Pin(extern "C" fn(Handle, u8)),
    Read(extern "C" fn(Handle) -> u8),
}

#[derive(Clone, Copy)]
struct BoundPort {
    spec: PortSpec,
    accessor: Accessor,
}

/// Misuse of a port on a [`VerilatedModel`].
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PortAccessError {
    #[snafu(display(
        "Port {port} was not declared when verilated module {top} was instantiated"
    ))]
    NoSuchPort { top: String, port: String },

    #[snafu(display(
        "Port {port} on verilated module {top} is an {direction} port, but was used as an {attempted_direction} port"
    ))]
    WrongDirection {
        top: String,
        port: &'static str,
        direction: PortDirection,
        attempted_direction: PortDirection,
    },

    #[snafu(display(
        "Value {value:#04x} does not fit in the {width}-bit port {port} on verilated module {top}"
    ))]
    ValueTooWide {
        top: String,
        port: &'static str,
        width: u8,
        value: u8,
    },
}

/// An instance of a verilated top module. See
/// [`crate::VerilatorRuntime::instantiate`].
///
/// The model is finalized and freed when this value is dropped. It cannot
/// outlive the runtime that loaded its library.
pub struct VerilatedModel<'ctx> {
    top: String,
    handle: Handle,
    eval: extern "C" fn(Handle),
    delete: extern "C" fn(Handle),
    ports: HashMap<&'static str, BoundPort>,
    library: PhantomData<&'ctx Library>,
}

/// Copies the function pointer named `name` out of `library`.
///
/// # Safety
///
/// `T` must be the exact signature the shim gives `name`.
unsafe fn entry_point<T: Copy>(
    library: &Library,
    name: &str,
) -> Result<T, Whatever> {
    let symbol = unsafe { library.get::<T>(name.as_bytes()) }
        .whatever_context(format!("Verilator library has no symbol `{name}`"))?;
    Ok(*symbol)
}

impl<'ctx> VerilatedModel<'ctx> {
    /// Resolves the constructor, `eval`, destructor and every port accessor
    /// of `top`, then constructs one instance.
    pub(crate) fn load(
        library: &'ctx Library,
        top: &str,
        ports: &[PortSpec],
    ) -> Result<Self, Whatever> {
        let (new, eval, delete) = unsafe {
            (
                entry_point::<extern "C" fn() -> Handle>(
                    library,
                    &format!("ffi_new_V{top}"),
                )?,
                entry_point::<extern "C" fn(Handle)>(
                    library,
                    &format!("ffi_V{top}_eval"),
                )?,
                entry_point::<extern "C" fn(Handle)>(
                    library,
                    &format!("ffi_delete_V{top}"),
                )?,
            )
        };

        let mut bound = HashMap::with_capacity(ports.len());
        for &spec in ports {
            let accessor = match spec.direction {
                PortDirection::Input => Accessor::Pin(unsafe {
                    entry_point(library, &format!("ffi_V{top}_pin_{}", spec.name))?
                }),
                PortDirection::Output => Accessor::Read(unsafe {
                    entry_point(library, &format!("ffi_V{top}_read_{}", spec.name))?
                }),
            };
            bound.insert(spec.name, BoundPort { spec, accessor });
        }

        let handle = new();
        if handle.is_null() {
            whatever!("Constructor for module {} returned a null model", top);
        }

        Ok(Self {
            top: top.to_string(),
            handle,
            eval,
            delete,
            ports: bound,
            library: PhantomData,
        })
    }

    /// The Verilog name of the top module.
    pub fn top(&self) -> &str {
        &self.top
    }

    /// The declaration of `port`, if it was part of the instantiated
    /// interface.
    pub fn port(&self, port: &str) -> Option<PortSpec> {
        self.ports.get(port).map(|bound| bound.spec)
    }

    fn bound(&self, port: &str) -> Result<BoundPort, PortAccessError> {
        self.ports.get(port).copied().with_context(|| NoSuchPortSnafu {
            top: self.top.clone(),
            port: port.to_string(),
        })
    }

    fn wrong_direction(
        &self,
        spec: PortSpec,
        attempted_direction: PortDirection,
    ) -> PortAccessError {
        PortAccessError::WrongDirection {
            top: self.top.clone(),
            port: spec.name,
            direction: spec.direction,
            attempted_direction,
        }
    }

    /// Drives the input `port` to `value`. Takes effect on the next
    /// [`VerilatedModel::eval`].
    pub fn pin(&mut self, port: &str, value: u8) -> Result<(), PortAccessError> {
        let BoundPort { spec, accessor } = self.bound(port)?;
        let Accessor::Pin(pin) = accessor else {
            return Err(self.wrong_direction(spec, PortDirection::Input));
        };
        if value & !spec.mask() != 0 {
            return ValueTooWideSnafu {
                top: self.top.clone(),
                port: spec.name,
                width: spec.width,
                value,
            }
            .fail();
        }
        pin(self.handle, value);
        Ok(())
    }

    /// Samples the output `port` as of the last [`VerilatedModel::eval`].
    pub fn read(&self, port: &str) -> Result<u8, PortAccessError> {
        let BoundPort { spec, accessor } = self.bound(port)?;
        let Accessor::Read(read) = accessor else {
            return Err(self.wrong_direction(spec, PortDirection::Output));
        };
        Ok(read(self.handle) & spec.mask())
    }

    /// Equivalent to the Verilator `eval` method.
    pub fn eval(&mut self) {
        (self.eval)(self.handle);
    }
}

impl Drop for VerilatedModel<'_> {
    fn drop(&mut self) {
        (self.delete)(self.handle);
    }
}
