// SPDX-License-Identifier: GPL-3.0-or-later

//! Hand off to the platform: jump to the main image, reset or park.
//!
//! Only [`halt`] is portable. The jump and reset need a Cortex-M core
//! and are gated behind the `cortex-m` feature so the decision logic
//! still builds and tests on the host.

/// Park the CPU. The only way out is an external reset.
pub fn halt() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

#[cfg(all(feature = "cortex-m", target_arch = "arm"))]
pub use arm::{boot_main_application, system_reset, terminate};

#[cfg(all(feature = "cortex-m", target_arch = "arm"))]
mod arm {
    use {
        crate::{boot::Termination, config::FlashLayout, image::HEADER_SIZE},
        cortex_m::peripheral::SCB,
    };

    /// Reset the system. The bootloader runs again from scratch.
    pub fn system_reset() -> ! {
        SCB::sys_reset()
    }

    /// Jump into the image in the main slot.
    ///
    /// The application's vector table sits right after the image
    /// header.
    ///
    /// # Safety
    ///
    /// This modifies the stack pointer and vector table base and runs
    /// whatever code sits in the main slot. The caller must have
    /// verified the image first.
    pub unsafe fn boot_main_application(layout: &FlashLayout) -> ! {
        let vector_table = layout.main.base + HEADER_SIZE as u32;

        info!("jumping to application at {=u32:x}", vector_table);

        cortex_m::interrupt::disable();

        (*SCB::PTR).vtor.write(vector_table);
        cortex_m::asm::dsb();

        let msp = core::ptr::read_volatile(vector_table as *const u32);
        let reset = core::ptr::read_volatile((vector_table + 4) as *const u32);

        // Load the application's initial stack pointer, then jump to
        // its reset vector. Interrupts stay disabled until the
        // application re-enables them.
        core::arch::asm!(
            "msr MSP, {msp}",
            "bx {reset}",
            msp = in(reg) msp,
            reset = in(reg) reset,
            options(noreturn),
        );
    }

    /// Act on the outcome of a boot cycle. Never returns.
    ///
    /// # Safety
    ///
    /// See [`boot_main_application`].
    pub unsafe fn terminate(termination: Termination, layout: &FlashLayout) -> ! {
        match termination {
            Termination::BootMain => boot_main_application(layout),
            Termination::Reset => system_reset(),
            Termination::Halt => crate::port::halt(),
        }
    }
}
