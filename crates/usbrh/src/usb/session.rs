//! Device sessions
//!
//! A [`Session`] owns an open handle with the sensor's interface claimed.
//! The interface is released exactly once: by [`Session::close`], or by
//! `Drop` if the session goes out of scope first (early return or panic).
//! The handle is closed right after.

use common::{DeviceLayout, DeviceRef, Error, Result, UsbBus, UsbDevice, UsbHandle};
use protocol::UsbError;
use tracing::{debug, error, info, warn};

/// Progress of claiming the sensor's interface
///
/// A failed claim is followed by one kernel driver detach and one retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimState {
    Unclaimed,
    /// First claim failed; a kernel driver detach comes next
    DetachPending(UsbError),
    /// Driver detached; the claim is retried once
    DetachAttempted,
    Claimed,
    Failed(UsbError),
}

/// Outcome of the operation issued in a [`ClaimState`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimEvent {
    ClaimSucceeded,
    ClaimFailed(UsbError),
    DetachSucceeded,
    DetachFailed(UsbError),
}

impl ClaimState {
    /// Transition table
    pub fn next(self, event: ClaimEvent) -> ClaimState {
        use ClaimEvent::*;
        use ClaimState::*;

        match (self, event) {
            (Unclaimed | DetachAttempted, ClaimSucceeded) => Claimed,
            (Unclaimed, ClaimFailed(e)) => DetachPending(e),
            (DetachAttempted, ClaimFailed(e)) => Failed(e),
            (DetachPending(_), DetachSucceeded) => DetachAttempted,
            (DetachPending(_), DetachFailed(e)) => Failed(e),
            (state, _) => state,
        }
    }
}

/// Open device with the sensor interface claimed
pub struct Session<H: UsbHandle> {
    handle: H,
    interface: u8,
    ordinal: usize,
    released: bool,
}

impl<H: UsbHandle> Session<H> {
    pub fn handle_mut(&mut self) -> &mut H {
        &mut self.handle
    }

    pub fn interface(&self) -> u8 {
        self.interface
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Release the interface, then close the handle
    ///
    /// The handle is closed even when the release fails.
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        self.handle
            .release_interface(self.interface)
            .map_err(Error::Release)?;
        debug!(
            "Released interface {} on device #{}",
            self.interface, self.ordinal
        );
        Ok(())
    }
}

impl<H: UsbHandle> Drop for Session<H> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("{}", e);
        }
    }
}

/// Open the device, select its configuration and claim its interface
pub fn open_session<B: UsbBus>(
    bus: &B,
    device: &DeviceRef<B::Device>,
) -> Result<Session<B::Handle>> {
    let layout = device.device.layout().map_err(Error::Open)?;

    let mut handle = bus.open(&device.device).map_err(Error::Open)?;
    configure(&mut handle, layout)?;
    claim(&mut handle, layout.interface)?;

    info!(
        "Claimed interface {} on device #{} (bus={:03} device={:03})",
        layout.interface,
        device.ordinal,
        device.device.bus_number(),
        device.device.address()
    );

    Ok(Session {
        handle,
        interface: layout.interface,
        ordinal: device.ordinal,
        released: false,
    })
}

/// Run `f` inside a session and always close it afterwards
///
/// When both `f` and the release fail, the release failure is logged and the
/// error from `f` is returned.
pub fn with_session<B, T, F>(bus: &B, device: &DeviceRef<B::Device>, f: F) -> Result<T>
where
    B: UsbBus,
    F: FnOnce(&mut Session<B::Handle>) -> Result<T>,
{
    let mut session = open_session(bus, device)?;
    let outcome = f(&mut session);
    let released = session.close();

    match (outcome, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(release_error)) => {
            error!("{}", release_error);
            Err(e)
        }
    }
}

/// Select the declared configuration
///
/// When that fails, detaching the kernel driver is enough for the claim to
/// succeed, so the configuration is not retried.
fn configure<H: UsbHandle>(handle: &mut H, layout: DeviceLayout) -> Result<()> {
    let Err(e) = handle.set_active_configuration(layout.configuration) else {
        debug!("Configuration {} selected", layout.configuration);
        return Ok(());
    };

    debug!(
        "Setting configuration {} failed ({}), detaching kernel driver",
        layout.configuration, e
    );
    handle.detach_kernel_driver(layout.interface).map_err(|detach| {
        debug!("usb_detach_kernel_driver error: {}", detach);
        Error::Configure(e)
    })
}

fn claim<H: UsbHandle>(handle: &mut H, interface: u8) -> Result<()> {
    let mut state = ClaimState::Unclaimed;

    loop {
        let event = match &state {
            ClaimState::Claimed => return Ok(()),
            ClaimState::Failed(e) => return Err(Error::Claim(e.clone())),
            ClaimState::Unclaimed | ClaimState::DetachAttempted => {
                match handle.claim_interface(interface) {
                    Ok(()) => ClaimEvent::ClaimSucceeded,
                    Err(e) => ClaimEvent::ClaimFailed(e),
                }
            }
            ClaimState::DetachPending(cause) => {
                debug!(
                    "Claiming interface {} failed ({}), detaching kernel driver",
                    interface, cause
                );
                match handle.detach_kernel_driver(interface) {
                    Ok(()) => ClaimEvent::DetachSucceeded,
                    Err(e) => ClaimEvent::DetachFailed(e),
                }
            }
        };
        state = state.next(event);
    }
}
