//! Ordered hardware bring-up.
//!
//! A [`Sequencer`] holds named initialization steps and runs them in order,
//! stopping at the first one that fails. Nothing is retried or rolled back.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use probeos_hal::{Device, DeviceError};

/// A failed bring-up step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BringUpError {
    /// Name of the step that failed.
    pub step: &'static str,
    /// What went wrong.
    pub error: DeviceError,
}

impl fmt::Display for BringUpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} initialization failed: {}", self.step, self.error)
    }
}

type Action<'a> = Box<dyn FnMut() -> Result<(), DeviceError> + 'a>;

struct Step<'a> {
    name: &'static str,
    action: Action<'a>,
}

/// Ordered list of initialization steps.
#[derive(Default)]
pub struct Sequencer<'a> {
    steps: Vec<Step<'a>>,
}

impl<'a> Sequencer<'a> {
    /// Create an empty sequencer.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append a step.
    pub fn step(
        mut self,
        name: &'static str,
        action: impl FnMut() -> Result<(), DeviceError> + 'a,
    ) -> Self {
        self.steps.push(Step {
            name,
            action: Box::new(action),
        });
        self
    }

    /// Append a step that initializes `device`.
    pub fn device<D: Device + ?Sized>(self, device: &'a mut D) -> Self {
        let name = device.name();
        self.step(name, move || device.initialize())
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether there are no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order, reporting each outcome to `observer`.
    ///
    /// Stops at the first failure; later steps are not run.
    pub fn run(
        self,
        mut observer: impl FnMut(&'static str, &Result<(), DeviceError>),
    ) -> Result<(), BringUpError> {
        for mut step in self.steps {
            let result = (step.action)();
            observer(step.name, &result);
            if let Err(error) = result {
                return Err(BringUpError {
                    step: step.name,
                    error,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;

    struct Fake {
        name: &'static str,
        result: Result<(), DeviceError>,
        calls: usize,
    }

    impl Device for Fake {
        fn name(&self) -> &'static str {
            self.name
        }

        fn initialize(&mut self) -> Result<(), DeviceError> {
            self.calls += 1;
            self.result
        }
    }

    #[test]
    fn test_all_steps_run_in_order() {
        let ran = RefCell::new(Vec::new());
        let sequencer = Sequencer::new()
            .step("interrupt", || {
                ran.borrow_mut().push("interrupt");
                Ok(())
            })
            .step("screen", || {
                ran.borrow_mut().push("screen");
                Ok(())
            })
            .step("serial", || {
                ran.borrow_mut().push("serial");
                Ok(())
            });
        assert_eq!(sequencer.len(), 3);

        let mut observed = Vec::new();
        let result = sequencer.run(|name, result| observed.push((name, *result)));

        assert_eq!(result, Ok(()));
        assert_eq!(*ran.borrow(), ["interrupt", "screen", "serial"]);
        assert_eq!(observed.len(), 3);
    }

    #[test]
    fn test_stops_at_each_failing_position() {
        const STEPS: usize = 8;
        for failing in 0..STEPS {
            let ran = RefCell::new(Vec::new());
            let mut sequencer = Sequencer::new();
            for index in 0..STEPS {
                let ran = &ran;
                sequencer = sequencer.step("step", move || {
                    ran.borrow_mut().push(index);
                    if index == failing {
                        Err(DeviceError::Timeout)
                    } else {
                        Ok(())
                    }
                });
            }

            let result = sequencer.run(|_, _| {});

            assert_eq!(
                result,
                Err(BringUpError {
                    step: "step",
                    error: DeviceError::Timeout
                })
            );
            let expected: Vec<usize> = (0..=failing).collect();
            assert_eq!(*ran.borrow(), expected);
        }
    }

    #[test]
    fn test_device_steps() {
        let mut ok = Fake {
            name: "timer",
            result: Ok(()),
            calls: 0,
        };
        let mut broken = Fake {
            name: "usb",
            result: Err(DeviceError::NotFound),
            calls: 0,
        };
        let mut never = Fake {
            name: "console",
            result: Ok(()),
            calls: 0,
        };

        let mut failed = None;
        let result = Sequencer::new()
            .device(&mut ok)
            .device(&mut broken)
            .device(&mut never)
            .run(|name, result| {
                if result.is_err() {
                    failed = Some(name);
                }
            });

        assert_eq!(result.unwrap_err().step, "usb");
        assert_eq!(failed, Some("usb"));
        assert_eq!((ok.calls, broken.calls, never.calls), (1, 1, 0));
    }

    #[test]
    fn test_empty_sequencer_succeeds() {
        let sequencer = Sequencer::new();
        assert!(sequencer.is_empty());
        assert_eq!(sequencer.run(|_, _| panic!("no steps")), Ok(()));
    }
}
