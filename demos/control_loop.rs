//! Control Loop Example - three periodic tasks and a sporadic set-point toggle
//!
//! Sensor, controller and actuator run every 5 ticks against a simulated
//! first-order plant. Pressing the user button (PC13) raises EXTI15_10, whose
//! handler queues a sporadic task that flips the set-point between 200 and
//! 400; the LED (PA5) shows which one is active. All shared values sit behind
//! priority-ceiling semaphores.

#![no_std]
#![no_main]

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use cortex_m_rt::entry;
use dmrtos::{
    os_aperiodic_finished, os_init, os_start, os_task_create_aperiodic, os_task_create_periodic,
    os_time_get, os_wait_next_period, OsHooks, OsStkElement, OsTcb, Semaphore,
};

#[cfg(feature = "pac")]
use stm32_metapac as pac;

// ============ Shared Data ============

/// Value guarded by its own semaphore
struct Shared<T> {
    sem: Semaphore,
    value: UnsafeCell<T>,
}

unsafe impl<T: Send> Sync for Shared<T> {}

impl<T: Copy> Shared<T> {
    const fn new(value: T) -> Self {
        Shared {
            sem: Semaphore::new(1, 1),
            value: UnsafeCell::new(value),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.sem.acquire();
        let r = f(unsafe { &mut *self.value.get() });
        self.sem.release();
        r
    }

    fn get(&self) -> T {
        self.with(|v| *v)
    }

    fn set(&self, value: T) {
        self.with(|v| *v = value);
    }
}

const SETPOINT_LOW: i32 = 200;
const SETPOINT_HIGH: i32 = 400;

static SETPOINT: Shared<i32> = Shared::new(SETPOINT_LOW);
static MEASURED: Shared<i32> = Shared::new(0);
static CONTROL: Shared<i32> = Shared::new(0);
static PLANT: Shared<i32> = Shared::new(0);

/// Sporadic toggle queued and not yet finished
static TOGGLE_PENDING: AtomicBool = AtomicBool::new(false);
static LAST_PRESS: AtomicU32 = AtomicU32::new(0);

/// Minimum ticks between two accepted button presses
const DEBOUNCE_TICKS: u32 = 10;

/// Deadline and period of every control task
const LOOP_TICKS: u32 = 5;

// ============ Task Storage ============

static mut SENSOR_STK: [OsStkElement; 256] = [0; 256];
static mut SENSOR_TCB: OsTcb = OsTcb::new();
static mut CONTROLLER_STK: [OsStkElement; 256] = [0; 256];
static mut CONTROLLER_TCB: OsTcb = OsTcb::new();
static mut ACTUATOR_STK: [OsStkElement; 256] = [0; 256];
static mut ACTUATOR_TCB: OsTcb = OsTcb::new();
static mut TOGGLE_STK: [OsStkElement; 256] = [0; 256];
static mut TOGGLE_TCB: OsTcb = OsTcb::new();

// ============ Board ============

const BUTTON_PIN: usize = 13;
/// EXTICR port code of GPIOC
const BUTTON_PORT: u8 = 2;

#[cfg(feature = "pac")]
fn board_init() {
    pac::RCC.ahb1enr().modify(|w| {
        w.set_gpioaen(true);
        w.set_gpiocen(true);
    });
    pac::RCC.apb2enr().modify(|w| w.set_syscfgen(true));
    pac::GPIOA.moder().modify(|w| w.set_moder(5, pac::gpio::vals::Moder::OUTPUT));
    pac::GPIOA.otyper().modify(|w| w.set_ot(5, pac::gpio::vals::Ot::PUSHPULL));
    pac::GPIOC
        .moder()
        .modify(|w| w.set_moder(BUTTON_PIN, pac::gpio::vals::Moder::INPUT));

    // Button is active low: falling edge on line 13
    pac::SYSCFG
        .exticr(BUTTON_PIN / 4)
        .modify(|w| w.set_exti(BUTTON_PIN % 4, BUTTON_PORT));
    pac::EXTI.ftsr(0).modify(|w| w.set_line(BUTTON_PIN, true));
    pac::EXTI.pr(0).write(|w| w.set_line(BUTTON_PIN, true));
    pac::EXTI.imr(0).modify(|w| w.set_line(BUTTON_PIN, true));
    unsafe { cortex_m::peripheral::NVIC::unmask(pac::Interrupt::EXTI15_10) };
}

#[cfg(feature = "pac")]
fn led_set(on: bool) {
    if on {
        pac::GPIOA.bsrr().write(|w| w.set_bs(5, true));
    } else {
        pac::GPIOA.bsrr().write(|w| w.set_br(5, true));
    }
}

#[cfg(not(feature = "pac"))]
fn board_init() {}
#[cfg(not(feature = "pac"))]
fn led_set(_: bool) {}

// ============ Hooks ============

fn on_startup() {
    board_init();
    led_set(false);
    dmrtos::info!("control loop starting, set-point {}", SETPOINT_LOW);
}

// ============ Interrupts ============

/// User button falling edge
#[cfg(feature = "pac")]
#[no_mangle]
pub extern "C" fn EXTI15_10() {
    pac::EXTI.pr(0).write(|w| w.set_line(BUTTON_PIN, true));
    on_button_press();
}

/// Queue a set-point toggle on each debounced press
///
/// Runs in interrupt context; the kernel pends the switch to the sporadic
/// task once the handler returns.
fn on_button_press() {
    let now = os_time_get();
    if now.wrapping_sub(LAST_PRESS.load(Ordering::Relaxed)) <= DEBOUNCE_TICKS {
        return;
    }
    LAST_PRESS.store(now, Ordering::Relaxed);

    if TOGGLE_PENDING.swap(true, Ordering::AcqRel) {
        return;
    }
    os_task_create_aperiodic(
        unsafe { &mut *(&raw mut TOGGLE_TCB) },
        unsafe { &mut *(&raw mut TOGGLE_STK) },
        "Toggle",
        toggle_task,
    );
}

// ============ Tasks ============

fn sensor_task(_: *mut ()) -> ! {
    loop {
        let y = PLANT.get();
        MEASURED.set(y);
        os_wait_next_period();
    }
}

/// PI controller in fixed point (gains scaled by 1/16)
fn controller_task(_: *mut ()) -> ! {
    const KP: i32 = 12;
    const KI: i32 = 2;
    let mut integral: i32 = 0;

    loop {
        let error = SETPOINT.get() - MEASURED.get();
        integral = (integral + error).clamp(-4_000, 4_000);
        let u = ((KP * error + KI * integral) / 16).clamp(0, 1_000);
        CONTROL.set(u);
        os_wait_next_period();
    }
}

/// Drives the simulated plant with the controller output
fn actuator_task(_: *mut ()) -> ! {
    let mut iteration: u32 = 0;

    loop {
        let u = CONTROL.get();
        let y = PLANT.with(|y| {
            *y += (u - *y) / 8;
            *y
        });

        iteration = iteration.wrapping_add(1);
        if iteration % 200 == 0 {
            dmrtos::info!("y={} u={}", y, u);
        }
        os_wait_next_period();
    }
}

fn toggle_task(_: *mut ()) -> ! {
    let high = SETPOINT.with(|sp| {
        *sp = if *sp == SETPOINT_LOW { SETPOINT_HIGH } else { SETPOINT_LOW };
        *sp == SETPOINT_HIGH
    });
    led_set(high);
    dmrtos::info!("set-point toggled, high={}", high);

    TOGGLE_PENDING.store(false, Ordering::Release);
    os_aperiodic_finished()
}

// ============ Main ============

#[entry]
fn main() -> ! {
    os_init(OsHooks {
        on_startup,
        ..OsHooks::new()
    });

    os_task_create_periodic(
        unsafe { &mut *(&raw mut SENSOR_TCB) },
        unsafe { &mut *(&raw mut SENSOR_STK) },
        "Sensor",
        sensor_task,
        LOOP_TICKS,
        LOOP_TICKS,
    );
    os_task_create_periodic(
        unsafe { &mut *(&raw mut CONTROLLER_TCB) },
        unsafe { &mut *(&raw mut CONTROLLER_STK) },
        "Controller",
        controller_task,
        LOOP_TICKS,
        LOOP_TICKS,
    );
    os_task_create_periodic(
        unsafe { &mut *(&raw mut ACTUATOR_TCB) },
        unsafe { &mut *(&raw mut ACTUATOR_STK) },
        "Actuator",
        actuator_task,
        LOOP_TICKS,
        LOOP_TICKS,
    );

    os_start()
}
