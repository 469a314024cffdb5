//! Status console over USB CDC.
//!
//! The device and port live in critical-section statics so `USBCTRL_IRQ`
//! can service the bus while the mode loop blocks in a pattern or a settle.

use core::cell::RefCell;
use critical_section::Mutex;
use usb_device::prelude::*;
use usbd_serial::SerialPort;

use rp235x_hal as hal;
use hal::pac::{self, interrupt};
use hal::usb::UsbBus;
use usb_device::bus::UsbBusAllocator;

use sos_panel::peripherals::{Screen, StatusDisplay};

static USB_DEVICE: Mutex<RefCell<Option<UsbDevice<'static, UsbBus>>>> = Mutex::new(RefCell::new(None));
static USB_SERIAL: Mutex<RefCell<Option<SerialPort<'static, UsbBus>>>> = Mutex::new(RefCell::new(None));

/// Brings up the console and unmasks `USBCTRL_IRQ`. Call once, before the
/// mode controller starts writing screens.
pub fn init(
    usb_periph: pac::USB,
    usb_dpram: pac::USB_DPRAM,
    usb_clock: hal::clocks::UsbClock,
    resets: &mut pac::RESETS,
) {
    let bus = UsbBus::new(usb_periph, usb_dpram, usb_clock, true, resets);

    // Allocator must outlive the device and port
    static mut ALLOCATOR: Option<UsbBusAllocator<UsbBus>> = None;

    // Safety: runs once from `hardware::init`, before the IRQ is unmasked.
    let allocator: &'static UsbBusAllocator<UsbBus> = unsafe {
        let slot = core::ptr::addr_of_mut!(ALLOCATOR);
        (*slot).insert(UsbBusAllocator::new(bus))
    };

    let serial = SerialPort::new(allocator);
    let Ok(builder) = UsbDeviceBuilder::new(allocator, UsbVidPid(0x16c0, 0x27dd))
        .strings(&[StringDescriptors::default()
            .manufacturer("Raspberry Pi")
            .product("Pico 2 W SOS Panel")
            .serial_number("SOS001")])
    else {
        defmt::panic!("USB string descriptors rejected");
    };
    let usb_dev = builder.device_class(usbd_serial::USB_CLASS_CDC).build();

    critical_section::with(|cs| {
        USB_DEVICE.borrow_ref_mut(cs).replace(usb_dev);
        USB_SERIAL.borrow_ref_mut(cs).replace(serial);
    });

    unsafe {
        cortex_m::peripheral::NVIC::unmask(pac::Interrupt::USBCTRL_IRQ);
    }
}

/// Queues `data` on the console.
///
/// Bytes that do not fit in the endpoint buffer, or that arrive while no
/// host is attached, are dropped.
pub fn write(data: &[u8]) {
    critical_section::with(|cs| {
        let mut serial = USB_SERIAL.borrow_ref_mut(cs);
        if let Some(serial) = serial.as_mut() {
            let _ = serial.write(data);
        }
    });
}

pub fn write_line(line: &str) {
    write(line.as_bytes());
    write(b"\r\n");
}

/// Status screens rendered as text lines on the serial console.
pub struct UsbConsole;

impl StatusDisplay for UsbConsole {
    fn show(&mut self, screen: Screen) {
        write(b"\r\n");
        for line in screen.lines() {
            write_line(line);
        }
    }
}

/// Keeps the console enumerated and discards host input.
#[allow(non_snake_case)]
#[interrupt]
fn USBCTRL_IRQ() {
    critical_section::with(|cs| {
        let mut dev = USB_DEVICE.borrow_ref_mut(cs);
        let mut serial = USB_SERIAL.borrow_ref_mut(cs);

        if let (Some(dev), Some(serial)) = (dev.as_mut(), serial.as_mut()) {
            if dev.poll(&mut [serial]) {
                // The console is output-only; drain whatever the host sends
                let mut buf = [0u8; 64];
                let _ = serial.read(&mut buf);
            }
        }
    });
}
