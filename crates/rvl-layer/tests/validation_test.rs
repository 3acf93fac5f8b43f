//! Integration test: validation object chain
//!
//! Verifies hook ordering around forwarded calls, skipping, per-command
//! intercept lists, feature filtering and releasing objects from a live
//! chain.

mod common;

use std::ptr;
use std::sync::Arc;

use ash::vk;
use ash::vk::Handle;
use common::{make_device, settings_with};
use parking_lot::Mutex;
use rvl_core::LayerSettings;
use rvl_layer::{Command, LayerObjectTypeId, ValidationChain, ValidationObject};

/// Records every hook it sees and optionally vetoes one command.
struct Recorder {
    kind: LayerObjectTypeId,
    veto: Option<Command>,
    only: Option<Command>,
    log: Mutex<Vec<String>>,
}

impl Recorder {
    fn new(kind: LayerObjectTypeId) -> Arc<Self> {
        Arc::new(Self {
            kind,
            veto: None,
            only: None,
            log: Mutex::new(Vec::new()),
        })
    }

    fn vetoing(kind: LayerObjectTypeId, command: Command) -> Arc<Self> {
        Arc::new(Self {
            kind,
            veto: Some(command),
            only: None,
            log: Mutex::new(Vec::new()),
        })
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }
}

impl ValidationObject for Recorder {
    fn container_type(&self) -> LayerObjectTypeId {
        self.kind
    }

    fn intercepts(&self, command: Command) -> bool {
        self.only.map_or(true, |only| only == command)
    }

    fn pre_call_validate(&self, command: Command) -> bool {
        self.log.lock().push(format!("validate {}", command.name()));
        self.veto == Some(command)
    }

    fn pre_call_record(&self, command: Command) {
        self.log.lock().push(format!("pre {}", command.name()));
    }

    fn post_call_record(&self, command: Command, result: vk::Result) {
        self.log
            .lock()
            .push(format!("post {} {:?}", command.name(), result));
    }

    fn object_created(&self, object_type: vk::ObjectType, _handle: u64) {
        self.log.lock().push(format!("created {:?}", object_type));
    }

    fn object_destroyed(&self, object_type: vk::ObjectType, _handle: u64) {
        self.log.lock().push(format!("destroyed {:?}", object_type));
    }
}

fn objects(list: &[Arc<Recorder>]) -> Vec<Arc<dyn ValidationObject>> {
    list.iter()
        .map(|object| object.clone() as Arc<dyn ValidationObject>)
        .collect()
}

#[test]
fn test_hooks_run_in_order_around_the_call() {
    let recorder = Recorder::new(LayerObjectTypeId::CoreValidation);
    let (_driver, _instance, device) =
        make_device(LayerSettings::default(), objects(&[recorder.clone()]));

    let mut buffer = vk::Buffer::null();
    unsafe { device.create_buffer(&vk::BufferCreateInfo::default(), ptr::null(), &mut buffer) };
    unsafe { device.destroy_buffer(buffer, ptr::null()) };

    assert_eq!(
        recorder.log(),
        vec![
            "validate vkCreateBuffer",
            "pre vkCreateBuffer",
            "created BUFFER",
            "post vkCreateBuffer SUCCESS",
            "validate vkDestroyBuffer",
            "pre vkDestroyBuffer",
            "destroyed BUFFER",
            "post vkDestroyBuffer SUCCESS",
        ]
    );
}

#[test]
fn test_skip_returns_validation_failed_without_forwarding() {
    let vetoing = Recorder::vetoing(LayerObjectTypeId::CoreValidation, Command::CreateBuffer);
    let other = Recorder::new(LayerObjectTypeId::ObjectTracker);
    let (driver, _instance, device) =
        make_device(LayerSettings::default(), objects(&[vetoing.clone(), other.clone()]));

    let mut buffer = vk::Buffer::null();
    let result =
        unsafe { device.create_buffer(&vk::BufferCreateInfo::default(), ptr::null(), &mut buffer) };
    assert_eq!(result, vk::Result::ERROR_VALIDATION_FAILED_EXT);
    assert_eq!(buffer, vk::Buffer::null());
    assert!(device.handles().is_empty());

    // Every object still validates, nobody records
    assert_eq!(vetoing.log(), vec!["validate vkCreateBuffer"]);
    assert_eq!(other.log(), vec!["validate vkCreateBuffer"]);

    // Other commands go through
    let mut fence = vk::Fence::null();
    let result =
        unsafe { device.create_fence(&vk::FenceCreateInfo::default(), ptr::null(), &mut fence) };
    assert_eq!(result, vk::Result::SUCCESS);

    // The fence got the first handle the driver ever minted
    match device.handles().unwrap(fence.as_raw()) {
        Some(real) => assert_eq!(real, 0x10_0000),
        None => panic!("expected a wrapped fence, got {:?}", fence),
    }
    assert!(driver.is_real(0x10_0000));
}

#[test]
fn test_intercept_lists_only_hold_interested_objects() {
    let picky = Arc::new(Recorder {
        kind: LayerObjectTypeId::Threading,
        veto: None,
        only: Some(Command::CreateFence),
        log: Mutex::new(Vec::new()),
    });
    let chain = ValidationChain::new(objects(&[picky.clone()]));
    assert_eq!(chain.intercepting(Command::CreateFence).len(), 1);
    assert!(chain.intercepting(Command::CreateBuffer).is_empty());

    let result = chain.intercept(Command::CreateBuffer, || vk::Result::SUCCESS);
    assert_eq!(result, vk::Result::SUCCESS);
    assert!(picky.log().is_empty());
}

#[test]
fn test_disabled_features_drop_their_objects() {
    let best_practices = Recorder::new(LayerObjectTypeId::BestPractices);
    let core = Recorder::new(LayerObjectTypeId::CoreValidation);

    let (_driver, _instance, device) = make_device(
        settings_with("core_checks", ""),
        objects(&[best_practices.clone(), core.clone()]),
    );
    // Best practices is off by default, core checks was switched off
    assert!(device.validation_object(LayerObjectTypeId::BestPractices).is_none());
    assert!(device.validation_object(LayerObjectTypeId::CoreValidation).is_none());

    let (_driver, _instance, device) = make_device(
        settings_with("", "best_practices"),
        objects(&[best_practices, core]),
    );
    assert!(device.validation_object(LayerObjectTypeId::BestPractices).is_some());
    assert!(device.validation_object(LayerObjectTypeId::CoreValidation).is_some());
}

#[test]
fn test_released_object_stops_seeing_calls() {
    let core = Recorder::new(LayerObjectTypeId::CoreValidation);
    let tracker = Recorder::new(LayerObjectTypeId::ObjectTracker);
    let (_driver, _instance, device) =
        make_device(LayerSettings::default(), objects(&[core.clone(), tracker.clone()]));

    // A snapshot taken before the release keeps working
    let before = device.chain();
    device.release_validation_object(LayerObjectTypeId::CoreValidation);
    assert!(device.validation_object(LayerObjectTypeId::CoreValidation).is_none());
    assert_eq!(before.objects().len(), 2);
    assert_eq!(device.chain().objects().len(), 1);

    let mut fence = vk::Fence::null();
    unsafe { device.create_fence(&vk::FenceCreateInfo::default(), ptr::null(), &mut fence) };
    assert!(core.log().is_empty());
    assert!(tracker.log().contains(&"created FENCE".to_string()));

    device.release_all_validation_objects();
    assert!(device.chain().objects().is_empty());
    let seen = tracker.log().len();
    unsafe { device.destroy_fence(fence, ptr::null()) };
    assert_eq!(tracker.log().len(), seen);
}

#[test]
fn test_command_names_match_entry_points() {
    assert_eq!(Command::CreateBuffer.name(), "vkCreateBuffer");
    assert_eq!(
        Command::CmdPushDescriptorSetWithTemplateKHR.name(),
        "vkCmdPushDescriptorSetWithTemplateKHR"
    );
    for command in Command::ALL {
        assert!(command.name().starts_with("vk"), "{:?}", command);
    }
}
