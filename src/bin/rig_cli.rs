#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    if let Err(err) = native::run() {
        eprintln!("rig_cli error: {err}");
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use flexi_spine::geom::{Point3, Transform, Vec3};
    use flexi_spine::rig::{
        AdjustmentDescriptor, AnimCurve, AnimatedNode, ChainConfig, CounterTwistSolver,
        FalloffMode, FlexiNode, InstancerConfig, Keyframe, NodeKind, SceneTime, SpineConfig,
    };
    use std::f64::consts::{FRAC_PI_2, TAU};
    use std::fmt::Write as _;
    use std::fs;
    use std::path::{Path, PathBuf};

    const SNAPSHOT_QUANTIZE: f64 = 1e-6;
    const SNAPSHOT_DECIMALS: usize = 6;

    const USAGE: &str = r"rig_cli (flexi-spine)

USAGE:
  rig_cli list
  rig_cli run <scenario|all> [options]

SCENARIOS:
  straight_line
  closed_ring
  twisted_spine
  elbow_chain
  instancer_offset
  falloff_repeat
  counter_twist_sweep

OPTIONS (run):
  --out-dir <dir>    Write <scenario>.snap to this dir (required for `all`)
  --snap <path>      Write the snapshot to a file (single scenario only)
  --overwrite        Overwrite existing output files
  -h, --help         Show this help
";

    pub fn run() -> Result<(), String> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let mut args = Args::new(args);

        let Some(command) = args.next() else {
            print_usage();
            return Ok(());
        };

        match command.as_str() {
            "list" => {
                for scenario in Scenario::ALL {
                    println!("{}", scenario.name());
                }
                Ok(())
            }
            "run" => cmd_run(&mut args),
            "-h" | "--help" | "help" => {
                print_usage();
                Ok(())
            }
            other => Err(format!("unknown command `{other}`\n\n{USAGE}")),
        }
    }

    fn print_usage() {
        println!("{USAGE}");
    }

    fn cmd_run(args: &mut Args) -> Result<(), String> {
        let scenario_name = args.next().ok_or("missing scenario name")?;

        let mut out_dir: Option<PathBuf> = None;
        let mut snap_path: Option<PathBuf> = None;
        let mut overwrite = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--out-dir" => out_dir = Some(PathBuf::from(args.value("--out-dir")?)),
                "--snap" => snap_path = Some(PathBuf::from(args.value("--snap")?)),
                "--overwrite" => overwrite = true,
                "-h" | "--help" => {
                    print_usage();
                    return Ok(());
                }
                other => return Err(format!("unknown option `{other}`\n\n{USAGE}")),
            }
        }

        if let Some(dir) = out_dir.as_ref() {
            if snap_path.is_some() {
                return Err("use either --out-dir or --snap (not both)".to_string());
            }
            fs::create_dir_all(dir).map_err(|e| format!("create out dir: {e}"))?;

            let scenarios: Vec<Scenario> = if scenario_name == "all" {
                Scenario::ALL.to_vec()
            } else {
                vec![Scenario::from_str(&scenario_name).ok_or_else(|| unknown_scenario(&scenario_name))?]
            };
            for scenario in scenarios {
                let snapshot = run_scenario(scenario)?;
                let path = dir.join(format!("{}.snap", scenario.name()));
                write_text_file(&path, &snapshot, overwrite)?;
                eprintln!("wrote {}", path.display());
            }
            return Ok(());
        }

        if scenario_name == "all" {
            return Err("`run all` requires --out-dir".to_string());
        }

        let scenario =
            Scenario::from_str(&scenario_name).ok_or_else(|| unknown_scenario(&scenario_name))?;
        let snapshot = run_scenario(scenario)?;
        if let Some(path) = snap_path.as_deref() {
            write_text_file(path, &snapshot, overwrite)?;
            eprintln!("wrote {}", path.display());
        } else {
            print!("{snapshot}");
        }
        Ok(())
    }

    fn unknown_scenario(name: &str) -> String {
        format!("unknown scenario `{name}` (try `rig_cli list`)")
    }

    fn write_text_file(path: &Path, text: &str, overwrite: bool) -> Result<(), String> {
        if path.exists() && !overwrite {
            return Err(format!(
                "refusing to overwrite existing file {} (use --overwrite)",
                path.display()
            ));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("create dir {}: {e}", parent.display()))?;
        }
        fs::write(path, text).map_err(|e| format!("write {}: {e}", path.display()))
    }

    fn quantize_f64(value: f64) -> f64 {
        if !value.is_finite() {
            return value;
        }
        let q = (value / SNAPSHOT_QUANTIZE).round() * SNAPSHOT_QUANTIZE;
        if q == 0.0 { 0.0 } else { q }
    }

    fn write_vec3_line(out: &mut String, prefix: &str, v: Vec3) {
        let _ = write!(out, "{prefix}");
        for component in [v.x, v.y, v.z] {
            let _ = write!(out, " {:.SNAPSHOT_DECIMALS$}", quantize_f64(component));
        }
        out.push('\n');
    }

    fn write_frames(out: &mut String, frames: &[Transform]) {
        let _ = writeln!(out, "frames {}", frames.len());
        for frame in frames {
            write_vec3_line(out, "p", frame.translation());
            write_vec3_line(out, "t", frame.axis(0));
            write_vec3_line(out, "n", frame.axis(1));
        }
    }

    fn snapshot(scenario: Scenario, sections: impl FnOnce(&mut String)) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# flexi-spine golden v1");
        let _ = writeln!(out, "scenario {}", scenario.name());
        let _ = writeln!(out, "quantize {SNAPSHOT_QUANTIZE:.1e}");
        sections(&mut out);
        out
    }

    fn evaluated(kind: NodeKind) -> Result<FlexiNode, String> {
        let mut node = FlexiNode::new(kind);
        node.evaluate().map_err(|e| e.to_string())?;
        Ok(node)
    }

    fn node_snapshot(scenario: Scenario, kind: NodeKind) -> Result<String, String> {
        let node = evaluated(kind)?;
        let frames = node.local_frames().map_err(|e| e.to_string())?;
        Ok(snapshot(scenario, |out| write_frames(out, frames)))
    }

    fn spine(points: Vec<Point3>, output_count: usize) -> SpineConfig {
        let mut config = SpineConfig {
            control_points: points,
            ..SpineConfig::default()
        };
        config.rig.output_count = output_count;
        config
    }

    fn ring(count: usize, radius: f64) -> Vec<Point3> {
        (0..count)
            .map(|i| {
                let angle = TAU * i as f64 / count as f64;
                Point3::new(angle.cos() * radius, 0.0, angle.sin() * radius)
            })
            .collect()
    }

    fn sweep_spine(angle: f64) -> NodeKind {
        NodeKind::Spine(spine(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(0.0, 0.0, 2.0),
                Point3::new(0.0, 1.0, 4.0),
                Point3::new(2.0 * angle.sin(), 1.0, 4.0 + 2.0 * angle.cos()),
            ],
            6,
        ))
    }

    fn run_scenario(scenario: Scenario) -> Result<String, String> {
        match scenario {
            Scenario::StraightLine => {
                let mut config =
                    spine((0..4).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect(), 5);
                config.rig.compute_orientation = false;
                node_snapshot(scenario, NodeKind::Spine(config))
            }
            Scenario::ClosedRing => {
                let mut config = spine(ring(6, 5.0), 12);
                config.close_curve = true;
                node_snapshot(scenario, NodeKind::Spine(config))
            }
            Scenario::TwistedSpine => {
                let mut config = spine(
                    vec![
                        Point3::new(0.0, 0.0, 0.0),
                        Point3::new(0.0, 3.0, 0.0),
                        Point3::new(2.0, 6.0, 1.0),
                        Point3::new(2.0, 9.0, 3.0),
                        Point3::new(0.0, 12.0, 3.0),
                    ],
                    8,
                );
                config.rig.up_vector = Vec3::Z;
                config.rig.twist.start_twist = -0.5;
                config.rig.twist.end_twist = FRAC_PI_2;
                node_snapshot(scenario, NodeKind::Spine(config))
            }
            Scenario::ElbowChain => node_snapshot(
                scenario,
                NodeKind::ChainSingle(ChainConfig {
                    points: vec![
                        Point3::new(0.0, 0.0, 0.0),
                        Point3::new(10.0, 0.0, 0.0),
                        Point3::new(10.0, 10.0, 0.0),
                    ],
                    joint_radius: 3.0,
                    joint_offset: 0.5,
                    ..ChainConfig::default()
                }),
            ),
            Scenario::InstancerOffset => {
                let mut config = InstancerConfig {
                    control_points: ring(8, 4.0),
                    close_curve: true,
                    offset: 0.125,
                    ..InstancerConfig::default()
                };
                config.rig.output_count = 9;
                node_snapshot(scenario, NodeKind::Instancer(config))
            }
            Scenario::FalloffRepeat => {
                let mut config =
                    spine((0..6).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect(), 17);
                config.rig.scale_adjustments.enabled = true;
                config.rig.scale_adjustments.adjustments.push(AdjustmentDescriptor {
                    value: Vec3::new(0.0, 1.0, 1.0),
                    falloff_mode: FalloffMode::Forward,
                    falloff_distance: 0.25,
                    repeat: true,
                    ..AdjustmentDescriptor::default()
                });
                let node = evaluated(NodeKind::Spine(config))?;
                let scales = node.local_scales().map_err(|e| e.to_string())?;
                Ok(snapshot(scenario, |out| {
                    let _ = writeln!(out, "scales {}", scales.len());
                    for scale in scales {
                        write_vec3_line(out, "s", scale);
                    }
                }))
            }
            Scenario::CounterTwistSweep => {
                let angle_at = |time: f64| FRAC_PI_2 * time / 10.0;
                let mut provider =
                    AnimatedNode::new(FlexiNode::new(sweep_spine(0.0)), move |time, node| {
                        node.set_kind(sweep_spine(angle_at(time)));
                    });
                let mut time = SceneTime::new(0.0);
                let mut curve = AnimCurve::new();
                let keys: Vec<Keyframe> = CounterTwistSolver::new(0.0, 10.0, 1.0)
                    .solve(&mut provider, &mut time, &mut curve)
                    .map_err(|e| e.to_string())?;
                Ok(snapshot(scenario, |out| {
                    let _ = writeln!(out, "keys {}", keys.len());
                    for key in &keys {
                        let _ = writeln!(
                            out,
                            "k {:.SNAPSHOT_DECIMALS$} {:.SNAPSHOT_DECIMALS$}",
                            quantize_f64(key.time),
                            quantize_f64(key.value)
                        );
                    }
                }))
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Scenario {
        StraightLine,
        ClosedRing,
        TwistedSpine,
        ElbowChain,
        InstancerOffset,
        FalloffRepeat,
        CounterTwistSweep,
    }

    impl Scenario {
        const ALL: &'static [Scenario] = &[
            Scenario::StraightLine,
            Scenario::ClosedRing,
            Scenario::TwistedSpine,
            Scenario::ElbowChain,
            Scenario::InstancerOffset,
            Scenario::FalloffRepeat,
            Scenario::CounterTwistSweep,
        ];

        fn name(self) -> &'static str {
            match self {
                Scenario::StraightLine => "straight_line",
                Scenario::ClosedRing => "closed_ring",
                Scenario::TwistedSpine => "twisted_spine",
                Scenario::ElbowChain => "elbow_chain",
                Scenario::InstancerOffset => "instancer_offset",
                Scenario::FalloffRepeat => "falloff_repeat",
                Scenario::CounterTwistSweep => "counter_twist_sweep",
            }
        }

        fn from_str(name: &str) -> Option<Self> {
            Self::ALL.iter().copied().find(|s| s.name() == name)
        }
    }

    struct Args {
        args: Vec<String>,
        pos: usize,
    }

    impl Args {
        fn new(args: Vec<String>) -> Self {
            Self { args, pos: 0 }
        }

        fn next(&mut self) -> Option<String> {
            let arg = self.args.get(self.pos)?.clone();
            self.pos += 1;
            Some(arg)
        }

        fn value(&mut self, flag: &str) -> Result<String, String> {
            self.next()
                .ok_or_else(|| format!("missing value for {flag}"))
        }
    }
}
