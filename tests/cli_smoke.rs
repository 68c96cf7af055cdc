use std::path::{Path, PathBuf};

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_povsuite")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "povsuite.exe"
            } else {
                "povsuite"
            });
            p
        })
}

fn write_project(dir: &Path) -> PathBuf {
    std::fs::write(dir.join("ball.pov"), "sphere { 0, {{r}} }\n").unwrap();
    let project = serde_json::json!({
        "config": { "fps": { "num": 4, "den": 1 }, "out_dir": "frames" },
        "params": { "r": 1.0 },
        "episodes": [
            { "duration": 0.5, "actions": [ { "param": "r", "to": 2.0 } ] },
            { "duration": 0.0 }
        ],
        "scene": { "file": "ball.pov" }
    });
    let path = dir.join("ball.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&project).unwrap()).unwrap();
    path
}

#[test]
fn cli_plan_lists_ticks_and_scenes() {
    let dir = tempfile::tempdir().unwrap();
    let project = write_project(dir.path());
    let scenes = dir.path().join("scenes");

    let out = std::process::Command::new(exe())
        .args(["plan", "--in"])
        .arg(&project)
        .arg("--scenes")
        .arg(&scenes)
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 3 + 1);
    assert!(lines[0].starts_with("000000000000\t"));
    assert!(lines[3].starts_with("000001000000\t"));
    assert!(lines[1].ends_with("000000000001.png"));

    assert_eq!(
        std::fs::read_to_string(scenes.join("000000000002.pov")).unwrap(),
        "sphere { 0, 2 }\n"
    );
}

#[test]
fn cli_rejects_a_broken_project() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, r#"{ "episodes": [ { "duration": -1 } ], "scene": { "inline": "" } }"#)
        .unwrap();
    let status = std::process::Command::new(exe())
        .args(["plan", "--in"])
        .arg(&path)
        .status()
        .unwrap();
    assert!(!status.success());
}

#[cfg(unix)]
#[test]
fn cli_render_runs_every_frame_through_the_pool() {
    use std::os::unix::fs::PermissionsExt as _;

    let dir = tempfile::tempdir().unwrap();
    let project = write_project(dir.path());

    let fake = dir.path().join("fake-povray");
    std::fs::write(
        &fake,
        "#!/bin/sh\n\
         for a in \"$@\"; do case \"$a\" in +O*) out=\"${a#+O}\";; esac; done\n\
         [ -n \"$out\" ] && printf 'P6\\n1 1\\n255\\n\\000\\000\\000' > \"$out\"\n\
         exit 0\n",
    )
    .unwrap();
    std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

    let frames = dir.path().join("out");
    let out = std::process::Command::new(exe())
        .args(["render", "--workers", "2", "--queue", "2", "--in"])
        .arg(&project)
        .arg("--out-dir")
        .arg(&frames)
        .arg("--povray")
        .arg(&fake)
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    for name in [
        "000000000000.png",
        "000000000001.png",
        "000000000002.png",
        "000001000000.png",
    ] {
        assert!(frames.join(name).exists(), "missing {name}");
    }
}
