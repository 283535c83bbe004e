use clap_host::ffi as sys;
use clap_host::{
    AudioConfig, AudioPortBuffer, ClapInstance, ClapLibrary, HostShim, InputEventList,
    OutputEventSink, ParamValue, PluginDiscovery, ProcessError,
};
use clap_plugin_authoring::{
    clap_export, AudioPortLayout, AudioProcessor, ParamSpec, Params, Plugin, PluginDescriptor,
    PluginFactory,
};
use pretty_assertions::assert_eq;

const GAIN: u32 = 10;
const SHAPE: u32 = 11;

static DESCRIPTORS: [PluginDescriptor; 2] = [
    PluginDescriptor {
        id: "dev.tests.mono-gain",
        name: "Mono Gain",
        vendor: "Tests",
        url: "",
        version: "1.0.0",
        description: "",
        features: &["audio-effect", "mono"],
    },
    PluginDescriptor {
        id: "dev.tests.drone",
        name: "Drone",
        vendor: "Tests",
        url: "",
        version: "1.0.0",
        description: "",
        features: &["instrument", "stereo"],
    },
];

static PARAMS: [ParamSpec; 2] = [
    ParamSpec {
        id: GAIN,
        name: "Gain",
        module: "Main",
        min: 0.0,
        max: 4.0,
        default: 1.0,
        flags: 0,
    },
    ParamSpec {
        id: SHAPE,
        name: "Shape",
        module: "Main",
        min: 0.0,
        max: 3.0,
        default: 0.0,
        flags: sys::CLAP_PARAM_IS_STEPPED,
    },
];

struct TestPlugin {
    descriptor: &'static PluginDescriptor,
    gain: f64,
    shape: f64,
}

impl TestPlugin {
    fn is_instrument(&self) -> bool {
        self.descriptor.id == DESCRIPTORS[1].id
    }
}

impl AudioProcessor for TestPlugin {
    fn process(&mut self, process: &mut sys::clap_process) -> sys::clap_process_status {
        let frames = process.frames_count as usize;
        unsafe {
            if process.audio_outputs_count != 1 {
                return sys::CLAP_PROCESS_ERROR;
            }
            let output = &*process.audio_outputs;
            for channel in 0..output.channel_count as usize {
                let out = std::slice::from_raw_parts_mut(*output.data32.add(channel), frames);
                if self.is_instrument() {
                    out.fill(0.25);
                    continue;
                }
                let input = &*process.audio_inputs;
                let samples = std::slice::from_raw_parts(*input.data32.add(channel), frames);
                for (out, sample) in out.iter_mut().zip(samples) {
                    *out = sample * self.gain as f32;
                }
            }
        }
        sys::CLAP_PROCESS_CONTINUE
    }
}

impl Params for TestPlugin {
    fn params(&self) -> &'static [ParamSpec] {
        if self.is_instrument() {
            &[]
        } else {
            &PARAMS
        }
    }

    fn param_value(&self, id: u32) -> Option<f64> {
        match id {
            GAIN => Some(self.gain),
            SHAPE => Some(self.shape),
            _ => None,
        }
    }

    fn set_param_value(&mut self, id: u32, value: f64) {
        match id {
            GAIN => self.gain = value,
            SHAPE => self.shape = value,
            _ => {}
        }
    }
}

impl Plugin for TestPlugin {
    fn descriptor(&self) -> &'static PluginDescriptor {
        self.descriptor
    }

    fn audio_ports(&self) -> AudioPortLayout {
        if self.is_instrument() {
            AudioPortLayout::STEREO_INSTRUMENT
        } else {
            AudioPortLayout::MONO_EFFECT
        }
    }
}

struct TestFactory;

impl PluginFactory for TestFactory {
    type Plugin = TestPlugin;

    fn descriptors() -> &'static [PluginDescriptor] {
        &DESCRIPTORS
    }

    fn new_plugin(descriptor_id: &str, _host: *const sys::clap_host) -> anyhow::Result<TestPlugin> {
        let descriptor = DESCRIPTORS
            .iter()
            .find(|descriptor| descriptor.id == descriptor_id)
            .ok_or_else(|| anyhow::anyhow!("unknown plug-in {descriptor_id}"))?;
        Ok(TestPlugin {
            descriptor,
            gain: 1.0,
            shape: 0.0,
        })
    }
}

clap_export!(TestFactory, TEST_ENTRY);

fn library() -> ClapLibrary {
    unsafe { ClapLibrary::from_entry("in-process/tests.clap", &TEST_ENTRY) }.unwrap()
}

fn config(max_frames_count: u32) -> AudioConfig {
    AudioConfig {
        sample_rate: 48_000.0,
        min_frames_count: 1,
        max_frames_count,
    }
}

#[test]
fn discovery_lists_every_descriptor() {
    let library = library();
    let descriptors = PluginDiscovery::new(library.factory().unwrap()).list();
    let ids: Vec<_> = descriptors.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["dev.tests.mono-gain", "dev.tests.drone"]);
    assert!(descriptors[0].is_audio_effect());
    assert!(!descriptors[0].is_instrument());
    assert!(descriptors[1].is_instrument());
    assert_eq!(descriptors[1].features, vec!["instrument", "stereo"]);
}

#[test]
fn params_and_ports_are_queryable() {
    let library = library();
    let host = HostShim::new("tests", "tests", "0.0.0");
    let descriptors = PluginDiscovery::new(library.factory().unwrap()).list();
    let instance =
        unsafe { ClapInstance::create(library.factory().unwrap(), &descriptors[0], host.as_raw()) }
            .unwrap();

    let params = instance.params().expect("gain exposes params");
    let infos = params.list();
    assert_eq!(infos.len(), 2);
    assert_eq!(infos[0].name, "Gain");
    assert_eq!(infos[0].module, "Main");
    assert_eq!(infos[0].max_value, 4.0);
    assert!(infos[1].is_stepped());
    assert_eq!(params.value(GAIN), Some(1.0));
    assert_eq!(params.value_to_text(SHAPE, 2.0).as_deref(), Some("2.00"));
    assert_eq!(params.value(99), None);

    let ports = instance.audio_ports().expect("ports extension");
    assert_eq!(ports.main_port(true).map(|port| port.channel_count), Some(1));
    assert_eq!(ports.main_port(false).map(|port| port.channel_count), Some(1));
    assert_eq!(
        ports.main_port(false).and_then(|port| port.port_type).as_deref(),
        Some("mono")
    );

    let drone = unsafe {
        ClapInstance::create(library.factory().unwrap(), &descriptors[1], host.as_raw())
    }
    .unwrap();
    assert!(drone.params().is_none());
    let ports = drone.audio_ports().unwrap();
    assert!(ports.main_port(true).is_none());
    assert_eq!(ports.count(false), 1);
}

#[test]
fn flush_applies_values_outside_process() {
    let library = library();
    let host = HostShim::new("tests", "tests", "0.0.0");
    let descriptors = PluginDiscovery::new(library.factory().unwrap()).list();
    let instance =
        unsafe { ClapInstance::create(library.factory().unwrap(), &descriptors[0], host.as_raw()) }
            .unwrap();
    let mut events = InputEventList::from_param_values(&[ParamValue { id: SHAPE, value: 3.0 }]);
    let sink = OutputEventSink::new();
    let params = instance.params().unwrap();
    params.flush(&mut events, &sink);
    assert_eq!(params.value(SHAPE), Some(3.0));
}

#[test]
fn process_applies_param_events_and_checks_state() {
    let library = library();
    let host = HostShim::new("tests", "tests", "0.0.0");
    let descriptors = PluginDiscovery::new(library.factory().unwrap()).list();
    let mut instance =
        unsafe { ClapInstance::create(library.factory().unwrap(), &descriptors[0], host.as_raw()) }
            .unwrap();

    let mut input = AudioPortBuffer::new(1, 64);
    let mut output = AudioPortBuffer::new(1, 64);
    input.channel_mut(0).fill(0.5);
    let mut events = InputEventList::new();
    let sink = OutputEventSink::new();

    unsafe {
        let err = instance
            .process_audio(&mut input, &mut output, 64, &mut events, &sink)
            .unwrap_err();
        assert_eq!(err, ProcessError::NotActivated);

        instance.activate(config(64)).unwrap();
        let err = instance
            .process_audio(&mut input, &mut output, 64, &mut events, &sink)
            .unwrap_err();
        assert_eq!(err, ProcessError::NotProcessing);

        instance.start_processing().unwrap();
        let err = instance
            .process_audio(&mut input, &mut output, 65, &mut events, &sink)
            .unwrap_err();
        assert_eq!(err, ProcessError::BlockTooLarge { frames: 65, max: 64 });

        events.push_param_value(ParamValue { id: GAIN, value: 2.0 }, 0);
        instance
            .process_audio(&mut input, &mut output, 32, &mut events, &sink)
            .unwrap();
    }
    assert_eq!(&output.channel(0)[..32], &[1.0f32; 32][..]);
    assert_eq!(instance.params().unwrap().value(GAIN), Some(2.0));

    unsafe {
        instance.activate(config(128)).unwrap();
        assert!(!instance.is_processing());
        assert_eq!(instance.config(), Some(config(128)));
    }
}

#[test]
fn instrument_runs_without_an_input_port() {
    let library = library();
    let host = HostShim::new("tests", "tests", "0.0.0");
    let descriptors = PluginDiscovery::new(library.factory().unwrap()).list();
    let mut instance =
        unsafe { ClapInstance::create(library.factory().unwrap(), &descriptors[1], host.as_raw()) }
            .unwrap();
    let mut input = AudioPortBuffer::new(0, 0);
    let mut output = AudioPortBuffer::new(2, 16);
    let mut events = InputEventList::new();
    let sink = OutputEventSink::new();
    unsafe {
        instance.activate(config(16)).unwrap();
        instance.start_processing().unwrap();
        instance
            .process_audio(&mut input, &mut output, 16, &mut events, &sink)
            .unwrap();
    }
    assert_eq!(output.channel(1), &[0.25f32; 16][..]);
}
